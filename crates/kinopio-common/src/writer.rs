//! Binary writer with back-patching.
//!
//! Formats with offset tables are written in one pass: placeholders are
//! reserved while the layout is being emitted and patched once the target
//! positions are known.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use zerocopy::{Immutable, IntoBytes};

use crate::{align_up, Endian};

macro_rules! write_endian {
    ($(#[$doc:meta])* $name:ident, $patch:ident, $ty:ty, $size:expr, $write:ident) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, value: $ty) {
            let mut bytes = [0u8; $size];
            match self.endian {
                Endian::Big => BigEndian::$write(&mut bytes, value),
                Endian::Little => LittleEndian::$write(&mut bytes, value),
            }
            self.buffer.extend_from_slice(&bytes);
        }

        /// Overwrite a previously written value at `position`.
        #[inline]
        pub fn $patch(&mut self, position: usize, value: $ty) {
            let slot = &mut self.buffer[position..position + $size];
            match self.endian {
                Endian::Big => BigEndian::$write(slot, value),
                Endian::Little => LittleEndian::$write(slot, value),
            }
        }
    };
}

/// A growable binary output buffer.
///
/// # Example
///
/// ```
/// use kinopio_common::{BinaryWriter, Endian};
///
/// let mut writer = BinaryWriter::new(Endian::Big);
/// let slot = writer.position();
/// writer.write_u32(0);
/// writer.write_u16(0xBEEF);
/// writer.patch_u32(slot, 6);
///
/// assert_eq!(writer.into_inner(), [0, 0, 0, 6, 0xBE, 0xEF]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
    endian: Endian,
}

impl BinaryWriter {
    /// Create an empty writer.
    pub fn new(endian: Endian) -> Self {
        Self {
            buffer: Vec::new(),
            endian,
        }
    }

    /// Create an empty writer with preallocated capacity.
    pub fn with_capacity(endian: Endian, capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            endian,
        }
    }

    /// Byte order used for multi-byte writes.
    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Current length of the output, i.e. the offset of the next write.
    #[inline]
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// View the bytes written so far.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the output.
    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Write a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    write_endian!(
        /// Write a u16.
        write_u16, patch_u16, u16, 2, write_u16
    );
    write_endian!(
        /// Write a 24-bit unsigned integer. `value` must fit in 24 bits.
        write_u24, patch_u24, u32, 3, write_u24
    );
    write_endian!(
        /// Write a u32.
        write_u32, patch_u32, u32, 4, write_u32
    );
    write_endian!(
        /// Write an i32.
        write_i32, patch_i32, i32, 4, write_i32
    );
    write_endian!(
        /// Write a u64.
        write_u64, patch_u64, u64, 8, write_u64
    );
    write_endian!(
        /// Write an i64.
        write_i64, patch_i64, i64, 8, write_i64
    );
    write_endian!(
        /// Write an f32.
        write_f32, patch_f32, f32, 4, write_f32
    );
    write_endian!(
        /// Write an f64.
        write_f64, patch_f64, f64, 8, write_f64
    );

    /// Write a struct using zerocopy.
    #[inline]
    pub fn write_struct<T: IntoBytes + Immutable>(&mut self, value: &T) {
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Pad with `fill` until the position is a multiple of `alignment`.
    pub fn align(&mut self, alignment: usize, fill: u8) {
        let target = align_up(self.buffer.len(), alignment);
        self.buffer.resize(target, fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryReader;

    #[test]
    fn test_write_little_endian() {
        let mut writer = BinaryWriter::new(Endian::Little);
        writer.write_u32(0x04030201);
        writer.write_u24(0x123456);
        assert_eq!(writer.as_slice(), &[0x01, 0x02, 0x03, 0x04, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_patch_and_align() {
        let mut writer = BinaryWriter::new(Endian::Big);
        writer.write_u8(0xC0);
        writer.write_u24(0);
        writer.write_u8(1);
        writer.align(4, 0);
        writer.patch_u24(1, 2);

        assert_eq!(writer.as_slice(), &[0xC0, 0, 0, 2, 1, 0, 0, 0]);
    }

    #[test]
    fn test_float_matches_reader() {
        let mut writer = BinaryWriter::new(Endian::Big);
        writer.write_f32(1.5);
        writer.write_f64(-2.25);
        let bytes = writer.into_inner();

        let mut reader = BinaryReader::with_endian(&bytes, Endian::Big);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_f64().unwrap(), -2.25);
    }
}
