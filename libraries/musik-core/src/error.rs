//! Core error types for musik

use crate::types::TrackId;
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for musik
#[derive(Error, Debug)]
pub enum CoreError {
    /// Track could not be materialized (missing, or lookup timed out)
    #[error("Track unavailable: {0}")]
    TrackUnavailable(TrackId),

    /// Index outside of a track list
    #[error("Index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Library is not connected
    #[error("Library disconnected")]
    Disconnected,

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Create an out of bounds error
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }

    /// Create an uncategorized error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
