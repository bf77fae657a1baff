//! Error types for playback coordination

use musik_core::CoreError;
use thiserror::Error;

/// Playback errors
///
/// Internal races (stale indices, tracks that fail to load mid-transition)
/// never surface here; they are resolved by clamping or by stopping. These
/// are the failures a caller can act on.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Playlist or library operation failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Output device could not be reloaded or switched
    #[error("Transport error: {0}")]
    Transport(String),

    /// Preferences file could not be parsed
    #[error("Invalid preferences: {0}")]
    PreferencesFormat(#[from] toml::de::Error),

    /// Preferences could not be serialized
    #[error("Failed to serialize preferences: {0}")]
    PreferencesSerialize(#[from] toml::ser::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybackError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
