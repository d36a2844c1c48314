//! Yaz0 header structure.

use kinopio_common::BinaryReader;
use zerocopy::byteorder::big_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{Error, Result};

/// Yaz0 stream header.
///
/// The size field is big-endian regardless of the byte order of the payload.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct Yaz0Header {
    /// `"Yaz0"`.
    pub magic: [u8; 4],
    /// Size of the decompressed data in bytes.
    pub decompressed_size: U32,
    /// Reserved, written as zero.
    pub reserved: [u8; 8],
}

impl Yaz0Header {
    /// The magic bytes at the start of a Yaz0 stream.
    pub const MAGIC: &'static [u8; 4] = b"Yaz0";

    /// Size of the header in bytes.
    pub const SIZE: usize = 16;

    /// Create a header for `decompressed_size` bytes of payload.
    pub fn new(decompressed_size: u32) -> Self {
        Self {
            magic: *Self::MAGIC,
            decompressed_size: U32::new(decompressed_size),
            reserved: [0; 8],
        }
    }

    /// Parse and validate the header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if !crate::is_yaz0(data) {
            return Err(Error::InvalidMagic {
                actual: data[..Self::MAGIC.len().min(data.len())].to_vec(),
            });
        }

        let mut reader = BinaryReader::new(data);
        Ok(reader.read_struct()?)
    }

    /// Declared size of the decompressed data.
    #[inline]
    pub fn decompressed_size(&self) -> usize {
        self.decompressed_size.get() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = Yaz0Header::new(0x0102_0304);
        assert_eq!(
            header.as_bytes(),
            &[b'Y', b'a', b'z', b'0', 1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(std::mem::size_of::<Yaz0Header>(), Yaz0Header::SIZE);
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(Yaz0Header::parse(b"Yaz0\0\0"), Err(Error::Common(_))));
        assert!(matches!(Yaz0Header::parse(b"Yay0\0\0\0\0"), Err(Error::InvalidMagic { .. })));
    }
}
