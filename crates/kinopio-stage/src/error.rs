//! Error types for stage loading.

use thiserror::Error;

/// Errors that abort building a stage.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("BYML error: {0}")]
    Byml(#[from] kinopio_byml::Error),

    #[error("archive error: {0}")]
    Narc(#[from] kinopio_narc::Error),

    /// A category under `AllInfos` this crate has no object kind for.
    #[error("unknown stage object type: {0}")]
    UnknownStageObjType(String),

    /// The document does not have the shape of stage data.
    #[error("malformed stage data: {0}")]
    MalformedStage(String),

    /// The archive lacks the entry holding stage data.
    #[error("archive has no entry named {0}")]
    MissingEntry(String),

    #[error("invalid stage file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: &'static str },

    /// An object refers to a rail index outside the stage's rail list.
    #[error("rail {rail} does not exist ({count} rails)")]
    InvalidRail { rail: usize, count: usize },
}

/// Result type for stage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Soft integrity problems. The builder keeps going with the data present.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageWarning {
    #[error("stage data inconsistent at {path}: {reason}")]
    StageDataInconsistent { path: String, reason: String },
}
