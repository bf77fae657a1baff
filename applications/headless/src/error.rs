//! Headless harness error types

use musik_playback::PlaybackError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HeadlessError>;

#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command: {0}")]
    Command(String),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<musik_core::CoreError> for HeadlessError {
    fn from(err: musik_core::CoreError) -> Self {
        HeadlessError::Playback(err.into())
    }
}

impl From<config::ConfigError> for HeadlessError {
    fn from(err: config::ConfigError) -> Self {
        HeadlessError::Config(err.to_string())
    }
}
