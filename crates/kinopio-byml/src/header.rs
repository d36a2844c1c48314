//! BYML header constants and node type tags.

use crate::{Error, Result};

/// Magic of a big-endian document.
pub const MAGIC_BIG: &[u8; 2] = b"BY";

/// Magic of a little-endian document.
pub const MAGIC_LITTLE: &[u8; 2] = b"YB";

/// Size of a header with three offsets (key table, string table, root).
pub const HEADER_SIZE: usize = 0x10;

/// Size of a version 1 header that also carries a binary-data table offset.
pub const HEADER_SIZE_WITH_BINARY: usize = 0x14;

/// Versions this crate reads and writes.
pub const SUPPORTED_VERSIONS: std::ops::RangeInclusive<u16> = 1..=7;

/// On-disk node type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeType {
    String = 0xA0,
    Binary = 0xA1,
    BinaryParam = 0xA2,
    Array = 0xC0,
    Dictionary = 0xC1,
    StringTable = 0xC2,
    BinaryTable = 0xC3,
    Bool = 0xD0,
    Int = 0xD1,
    Float = 0xD2,
    UInt = 0xD3,
    Int64 = 0xD4,
    UInt64 = 0xD5,
    Double = 0xD6,
    Null = 0xFF,
}

impl NodeType {
    /// Parse a tag byte read at `offset`.
    pub fn from_tag(tag: u8, offset: usize) -> Result<Self> {
        Ok(match tag {
            0xA0 => NodeType::String,
            0xA1 => NodeType::Binary,
            0xA2 => NodeType::BinaryParam,
            0xC0 => NodeType::Array,
            0xC1 => NodeType::Dictionary,
            0xC2 => NodeType::StringTable,
            0xC3 => NodeType::BinaryTable,
            0xD0 => NodeType::Bool,
            0xD1 => NodeType::Int,
            0xD2 => NodeType::Float,
            0xD3 => NodeType::UInt,
            0xD4 => NodeType::Int64,
            0xD5 => NodeType::UInt64,
            0xD6 => NodeType::Double,
            0xFF => NodeType::Null,
            _ => return Err(Error::UnsupportedNode { tag, offset }),
        })
    }

    /// The tag byte.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Containers are stored out of line and referenced by offset.
    #[inline]
    pub fn is_container(self) -> bool {
        matches!(self, NodeType::Array | NodeType::Dictionary)
    }
}
