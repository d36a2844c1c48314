//! Error types for BYML parsing and writing.

use thiserror::Error;

use crate::{NodeId, NodeType};

/// Errors that can occur when parsing or writing BYML documents.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid magic bytes (neither `BY` nor `YB`).
    #[error("invalid BYML magic: expected 'BY' or 'YB', got {actual:?}")]
    InvalidMagic { actual: Vec<u8> },

    /// Version outside the supported range.
    #[error("unsupported BYML version: {0} (expected 1 to 7)")]
    UnsupportedVersion(u16),

    /// Unknown node type tag.
    #[error("unsupported node type {tag:#04x} at {offset:#x}")]
    UnsupportedNode { tag: u8, offset: usize },

    /// A known node type where a different one is required.
    #[error("expected {expected:?} at {offset:#x}, found {actual:?}")]
    UnexpectedNode {
        expected: NodeType,
        actual: NodeType,
        offset: usize,
    },

    /// Offsets, lengths or table indices that do not resolve.
    #[error("corrupt BYML at {offset:#x}: {reason}")]
    CorruptStream { offset: usize, reason: String },

    /// A container that (indirectly) contains itself.
    #[error("cyclic reference to container at {offset:#x}")]
    CyclicReference { offset: usize },

    /// A hand-built document whose arena contains a cycle.
    #[error("cyclic reference to container {0:?}")]
    CyclicNode(NodeId),

    /// A node refers to an arena slot that does not exist or has another kind.
    #[error("node refers to invalid container {0:?}")]
    InvalidNodeId(NodeId),

    /// The top-level node required by the caller is not a dictionary.
    #[error("malformed stage data: {0}")]
    MalformedStage(String),

    /// Bytes that are not valid in the document's text encoding.
    #[error("invalid {encoding} text at {offset:#x}")]
    InvalidText { offset: usize, encoding: &'static str },

    /// A string that cannot be represented in the requested text encoding.
    #[error("cannot encode {text:?} as {encoding}")]
    UnencodableText { text: String, encoding: &'static str },

    /// Binary nodes were written to a version without a binary-data table.
    #[error("binary data requires BYML version 1, document is version {0}")]
    BinaryTableUnsupported(u16),

    /// Table or container too large for its 24-bit count.
    #[error("{0} has too many entries for a 24-bit count")]
    TooLarge(&'static str),

    #[cfg(feature = "json-export")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<kinopio_common::Error> for Error {
    fn from(err: kinopio_common::Error) -> Self {
        let offset = match &err {
            kinopio_common::Error::UnexpectedEof { offset, .. } => *offset,
            _ => 0,
        };
        Error::CorruptStream {
            offset,
            reason: err.to_string(),
        }
    }
}

/// Result type for BYML operations.
pub type Result<T> = std::result::Result<T, Error>;
