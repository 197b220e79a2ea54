//! Paint error types

use thiserror::Error;

/// Errors raised while recording pictures or building paints
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaintError {
    #[error("unmatched save/restore commands")]
    UnmatchedSaveRestore,

    #[error("invalid color stops: {0}")]
    InvalidColorStops(String),

    /// Raised by a canvas backend while flushing
    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, PaintError>;
