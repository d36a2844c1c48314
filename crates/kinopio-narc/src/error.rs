//! Error types for the NARC crate.

use thiserror::Error;

/// Errors that can occur when reading or writing NARC archives.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] kinopio_common::Error),

    /// Yaz0 decompression error.
    #[error("{0}")]
    Yaz0(#[from] kinopio_yaz0::Error),

    /// The (decompressed) data does not start with the NARC signature.
    #[error("not a NARC archive: expected 'NARC', got {actual:?}")]
    NotAnArchive { actual: Vec<u8> },

    /// Byte order mark other than little-endian.
    #[error("unsupported byte order mark: {0:#06x}")]
    UnsupportedBom(u16),

    /// A section is missing or has an unexpected signature.
    #[error("invalid section signature: expected {expected:?}, got {actual:?}")]
    InvalidSection { expected: [u8; 4], actual: [u8; 4] },

    /// Offsets or lengths point outside the archive.
    #[error("corrupt NARC at {offset:#x}: {reason}")]
    CorruptStream { offset: usize, reason: String },

    /// Two entries share the same path.
    #[error("duplicate entry name: {0}")]
    DuplicateName(String),

    /// An entry path cannot be stored in the name table.
    #[error("invalid entry name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Too many files or directories for the 16-bit tables.
    #[error("archive too large: {0}")]
    TooLarge(String),
}

/// Result type for NARC operations.
pub type Result<T> = std::result::Result<T, Error>;
