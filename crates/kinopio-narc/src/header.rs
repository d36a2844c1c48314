//! NARC header and section structures.

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// NARC file header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct NarcHeader {
    /// `"NARC"`.
    pub magic: [u8; 4],
    /// Byte order mark, `0xFFFE` when read little-endian.
    pub bom: U16,
    /// Format version, always `0x0100`.
    pub version: U16,
    /// Total archive size in bytes.
    pub file_size: U32,
    /// Size of this header (`0x10`).
    pub header_size: U16,
    /// Number of sections that follow (3).
    pub section_count: U16,
}

impl NarcHeader {
    /// The magic bytes at the start of a NARC archive.
    pub const MAGIC: &'static [u8; 4] = b"NARC";

    /// Little-endian byte order mark.
    pub const BOM: u16 = 0xFFFE;

    /// Size of the header in bytes.
    pub const SIZE: usize = 0x10;

    pub(crate) fn new(file_size: u32) -> Self {
        Self {
            magic: *Self::MAGIC,
            bom: U16::new(Self::BOM),
            version: U16::new(0x0100),
            file_size: U32::new(file_size),
            header_size: U16::new(Self::SIZE as u16),
            section_count: U16::new(3),
        }
    }
}

/// Common header of the `BTAF`, `BTNF` and `GMIF` sections.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct SectionHeader {
    /// Section signature.
    pub magic: [u8; 4],
    /// Section size including this header.
    pub size: U32,
}

impl SectionHeader {
    /// File allocation table.
    pub const BTAF: [u8; 4] = *b"BTAF";
    /// File name table.
    pub const BTNF: [u8; 4] = *b"BTNF";
    /// File image.
    pub const GMIF: [u8; 4] = *b"GMIF";

    /// Size of the section header in bytes.
    pub const SIZE: usize = 8;

    pub(crate) fn new(magic: [u8; 4], size: u32) -> Self {
        Self {
            magic,
            size: U32::new(size),
        }
    }
}

/// One file's extent inside the `GMIF` data, relative to its start.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FatEntry {
    /// First byte of the file.
    pub start: U32,
    /// One past the last byte of the file.
    pub end: U32,
}

impl FatEntry {
    pub(crate) fn new(start: u32, end: u32) -> Self {
        Self {
            start: U32::new(start),
            end: U32::new(end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        assert_eq!(std::mem::size_of::<NarcHeader>(), NarcHeader::SIZE);
        assert_eq!(std::mem::size_of::<SectionHeader>(), SectionHeader::SIZE);
        assert_eq!(std::mem::size_of::<FatEntry>(), 8);
    }

    #[test]
    fn test_header_bytes() {
        let header = NarcHeader::new(0x20);
        assert_eq!(&header.as_bytes()[..8], b"NARC\xFE\xFF\x00\x01");
    }
}
