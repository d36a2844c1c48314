//! Binary reader for zero-copy parsing of byte slices.
//!
//! This module provides [`BinaryReader`], a cursor-like type that reads
//! binary data from a byte slice without copying, in either byte order.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use zerocopy::FromBytes;

use crate::{Endian, Error, Result};

/// Generates a fixed-width read in the reader's byte order.
macro_rules! read_endian {
    ($(#[$doc:meta])* $name:ident, $peek:ident, $ty:ty, $size:expr, $read:ident) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self) -> Result<$ty> {
            let value = self.$peek()?;
            self.position += $size;
            Ok(value)
        }

        /// Read at the current position without advancing.
        #[inline]
        pub fn $peek(&self) -> Result<$ty> {
            let bytes = self.peek_bytes($size)?;
            Ok(match self.endian {
                Endian::Big => BigEndian::$read(bytes),
                Endian::Little => LittleEndian::$read(bytes),
            })
        }
    };
}

/// A binary reader that provides zero-copy reading from a byte slice.
///
/// # Example
///
/// ```
/// use kinopio_common::{BinaryReader, Endian};
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_u32().unwrap(), 0x04030201);
/// reader.set_endian(Endian::Big);
/// assert_eq!(reader.read_u32().unwrap(), 0x05060708);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
    endian: Endian,
}

impl<'a> BinaryReader<'a> {
    /// Create a new little-endian reader from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            endian: Endian::Little,
        }
    }

    /// Create a new reader with an explicit byte order.
    #[inline]
    pub const fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            position: 0,
            endian,
        }
    }

    /// Create a new reader starting at a specific position.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize, endian: Endian) -> Self {
        Self {
            data,
            position,
            endian,
        }
    }

    /// Get the byte order used for multi-byte reads.
    #[inline]
    pub const fn endian(&self) -> Endian {
        self.endian
    }

    /// Change the byte order used for multi-byte reads.
    #[inline]
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// The whole underlying buffer.
    #[inline]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Seek to an absolute position.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Advance the position by a number of bytes.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        self.position = self.position.saturating_add(count);
    }

    /// Get the remaining bytes as a slice.
    #[inline]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                offset: self.position,
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    read_endian!(
        /// Read a u16.
        read_u16, peek_u16, u16, 2, read_u16
    );
    read_endian!(
        /// Read an i16.
        read_i16, peek_i16, i16, 2, read_i16
    );
    read_endian!(
        /// Read a 24-bit unsigned integer.
        read_u24, peek_u24, u32, 3, read_u24
    );
    read_endian!(
        /// Read a u32.
        read_u32, peek_u32, u32, 4, read_u32
    );
    read_endian!(
        /// Read an i32.
        read_i32, peek_i32, i32, 4, read_i32
    );
    read_endian!(
        /// Read a u64.
        read_u64, peek_u64, u64, 8, read_u64
    );
    read_endian!(
        /// Read an i64.
        read_i64, peek_i64, i64, 8, read_i64
    );
    read_endian!(
        /// Read an f32.
        read_f32, peek_f32, f32, 4, read_f32
    );
    read_endian!(
        /// Read an f64.
        read_f64, peek_f64, f64, 8, read_f64
    );

    /// Read a null-terminated byte string, not including the terminator.
    /// Uses SIMD-accelerated null-terminator search via memchr.
    pub fn read_cbytes(&mut self) -> Result<&'a [u8]> {
        let remaining = self.remaining_bytes();
        let null_pos = memchr::memchr(0, remaining).ok_or(Error::MissingNullTerminator)?;
        self.position += null_pos + 1;
        Ok(&remaining[..null_pos])
    }

    /// Read a null-terminated UTF-8 string.
    pub fn read_cstring(&mut self) -> Result<&'a str> {
        let bytes = self.read_cbytes()?;
        std::str::from_utf8(bytes).map_err(Error::Utf8)
    }

    /// Read a struct using zerocopy.
    ///
    /// The struct must implement `FromBytes` from the zerocopy crate. Byte order
    /// of the fields is the struct's own business.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let offset = self.position;
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            offset,
            needed: size,
            available: bytes.len(),
        })
    }

    /// Expect specific magic bytes.
    pub fn expect_magic(&mut self, expected: &[u8]) -> Result<()> {
        let actual = self.read_bytes(expected.len())?;
        if actual != expected {
            return Err(Error::InvalidMagic {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [
            0x01u8, 0x02, 0x03, 0x04, // u32: 0x04030201
            0xFF, 0xFF, 0xFF, 0xFF, // u32: 0xFFFFFFFF
        ];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u32().unwrap(), 0x04030201);
        assert_eq!(reader.read_u32().unwrap(), 0xFFFFFFFF);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_big_endian() {
        let data = [0x00, 0x00, 0x80, 0x3F, 0x12, 0x34, 0x56];
        let mut reader = BinaryReader::with_endian(&data, Endian::Big);

        assert_eq!(reader.read_u32().unwrap(), 0x0000803F);
        assert_eq!(reader.read_u24().unwrap(), 0x123456);
    }

    #[test]
    fn test_u24_little_endian() {
        let data = [0x56, 0x34, 0x12];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_u24().unwrap(), 0x123456);
    }

    #[test]
    fn test_read_cstring() {
        let data = b"hello\0world\0";
        let mut reader = BinaryReader::new(data);

        assert_eq!(reader.read_cstring().unwrap(), "hello");
        assert_eq!(reader.read_cstring().unwrap(), "world");
        assert!(matches!(reader.read_cstring(), Err(Error::MissingNullTerminator)));
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.peek_u32().unwrap(), 0x04030201);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u32().unwrap(), 0x04030201);
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn test_eof_error() {
        let data = [0x01, 0x02];
        let mut reader = BinaryReader::new(&data);

        assert!(matches!(
            reader.read_u32(),
            Err(Error::UnexpectedEof { offset: 0, needed: 4, available: 2 })
        ));
    }

    #[test]
    fn test_expect_magic() {
        let mut reader = BinaryReader::new(b"NARC");
        assert!(reader.expect_magic(b"NARC").is_ok());

        let mut reader = BinaryReader::new(b"SARC");
        assert!(matches!(reader.expect_magic(b"NARC"), Err(Error::InvalidMagic { .. })));
    }
}
