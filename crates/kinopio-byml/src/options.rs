//! Decode and encode options.

use std::borrow::Cow;

use encoding_rs::SHIFT_JIS;
use kinopio_common::Endian;

/// Encoding of key and string table entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    ShiftJis,
    Utf8,
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::ShiftJis => "Shift-JIS",
            TextEncoding::Utf8 => "UTF-8",
        }
    }

    /// Decode table bytes. Returns `None` on malformed input.
    pub fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self {
            TextEncoding::ShiftJis => SHIFT_JIS.decode_without_bom_handling_and_without_replacement(bytes),
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
        }
    }

    /// Encode text for a table. Returns `None` if a character has no mapping.
    pub fn encode(self, text: &str) -> Option<Cow<'_, [u8]>> {
        match self {
            TextEncoding::ShiftJis => {
                let (bytes, _, unmappable) = SHIFT_JIS.encode(text);
                (!unmappable).then_some(bytes)
            }
            TextEncoding::Utf8 => Some(Cow::Borrowed(text.as_bytes())),
        }
    }
}

/// Options for [`Byml::parse_with`](crate::Byml::parse_with).
///
/// Byte order and version come from the header.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    pub encoding: TextEncoding,
}

/// Options for [`Byml::to_bytes_with`](crate::Byml::to_bytes_with).
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Override the document's byte order.
    pub endian: Option<Endian>,
    /// Override the document's version.
    pub version: Option<u16>,
    pub encoding: TextEncoding,
}
