//! Yaz0 decompression.

use crate::{Error, Result, Yaz0Header, MAX_MATCH};

/// Decompress a complete Yaz0 stream (header included).
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let header = Yaz0Header::parse(data)?;
    let size = header.decompressed_size();

    let body = &data[Yaz0Header::SIZE..];
    let mut output = Vec::with_capacity(initial_capacity(size, body.len()));
    decompress_into(body, size, &mut output)?;
    Ok(output)
}

/// Output reservation for a body of `body_len` bytes declaring `size`.
///
/// No input byte expands to more than one maximal back-reference, so a
/// header claiming more than that is not trusted up front.
fn initial_capacity(size: usize, body_len: usize) -> usize {
    size.min(body_len.saturating_mul(MAX_MATCH))
}

/// Decode a headerless Yaz0 body until `size` bytes have been produced.
///
/// Output is appended to `output`; back-references may only reach bytes
/// produced by this call.
pub fn decompress_into(body: &[u8], size: usize, output: &mut Vec<u8>) -> Result<()> {
    let base = output.len();
    let end = base + size;
    let mut src = 0usize;

    let next = |src: &mut usize| -> Result<u8> {
        let byte = body.get(*src).copied().ok_or(Error::CorruptStream {
            offset: Yaz0Header::SIZE + *src,
            reason: "stream ended before declared size",
        })?;
        *src += 1;
        Ok(byte)
    };

    while output.len() < end {
        let control = next(&mut src)?;

        for bit in (0..8).rev() {
            if output.len() >= end {
                break;
            }

            if control & (1 << bit) != 0 {
                output.push(next(&mut src)?);
                continue;
            }

            let op_offset = Yaz0Header::SIZE + src;
            let b1 = next(&mut src)?;
            let b2 = next(&mut src)?;
            let distance = ((((b1 & 0x0F) as usize) << 8) | b2 as usize) + 1;
            let length = match b1 >> 4 {
                0 => next(&mut src)? as usize + 0x12,
                n => n as usize + 2,
            };

            let produced = output.len() - base;
            if distance > produced {
                return Err(Error::CorruptStream {
                    offset: op_offset,
                    reason: "back-reference before start of output",
                });
            }

            // Byte-wise copy: the source may overlap the bytes being written.
            let start = output.len() - distance;
            let length = length.min(end - output.len());
            for i in 0..length {
                let byte = output[start + i];
                output.push(byte);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(size: u32, body: &[u8]) -> Vec<u8> {
        let mut data = zerocopy::IntoBytes::as_bytes(&Yaz0Header::new(size)).to_vec();
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_literals_only() {
        let data = stream(3, &[0xE0, b'a', b'b', b'c']);
        assert_eq!(decompress(&data).unwrap(), b"abc");
    }

    #[test]
    fn test_overlapping_back_reference() {
        // 'a', then copy 9 bytes from distance 1.
        let data = stream(10, &[0x80, b'a', 0x70, 0x00]);
        assert_eq!(decompress(&data).unwrap(), b"aaaaaaaaaa");
    }

    #[test]
    fn test_long_back_reference() {
        // Nibble 0 means length = next byte + 0x12.
        let data = stream(0x21, &[0x80, b'z', 0x00, 0x00, 0x0E]);
        assert_eq!(decompress(&data).unwrap(), vec![b'z'; 0x21]);
    }

    #[test]
    fn test_back_reference_before_start() {
        let data = stream(4, &[0x00, 0x10, 0x00]);
        assert!(matches!(
            decompress(&data),
            Err(Error::CorruptStream { offset: 0x11, .. })
        ));
    }

    #[test]
    fn test_truncated_stream() {
        let data = stream(8, &[0xFF, b'a', b'b']);
        assert!(matches!(decompress(&data), Err(Error::CorruptStream { .. })));
    }

    #[test]
    fn test_oversized_header_not_reserved() {
        assert_eq!(initial_capacity(0xFFFF_FFFF, 1), MAX_MATCH);
        assert_eq!(initial_capacity(10, 4), 10);

        let data = stream(u32::MAX, &[0xFF]);
        assert!(matches!(decompress(&data), Err(Error::CorruptStream { .. })));
    }

    #[test]
    fn test_empty_stream() {
        assert!(decompress(&stream(0, &[])).unwrap().is_empty());
    }
}
