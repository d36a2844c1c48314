//! Error types for Yaz0 compression.

use thiserror::Error;

/// Errors that can occur when decoding a Yaz0 stream.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] kinopio_common::Error),

    /// Invalid magic bytes (not a Yaz0 stream).
    #[error("invalid Yaz0 magic: expected 'Yaz0', got {actual:?}")]
    InvalidMagic { actual: Vec<u8> },

    /// Malformed body: a back-reference before the start of output, or the
    /// stream ended before the declared size was produced.
    #[error("corrupt Yaz0 stream at {offset:#x}: {reason}")]
    CorruptStream { offset: usize, reason: &'static str },
}

/// Result type for Yaz0 operations.
pub type Result<T> = std::result::Result<T, Error>;
