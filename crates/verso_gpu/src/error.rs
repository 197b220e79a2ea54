//! Renderer error types

use thiserror::Error;
use verso_paint::PaintError;

/// Errors raised while building a renderer or flushing a picture
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A replayed picture restores more states than it saves, or leaves
    /// states open
    #[error("unmatched save/restore in picture")]
    UnmatchedSaveRestore,

    #[error(transparent)]
    Paint(#[from] PaintError),

    #[error("invalid renderer config: {0}")]
    InvalidConfig(String),
}

impl From<RenderError> for PaintError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::UnmatchedSaveRestore => PaintError::UnmatchedSaveRestore,
            RenderError::Paint(err) => err,
            other => PaintError::Backend(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
