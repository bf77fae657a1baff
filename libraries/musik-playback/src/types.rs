//! Core types for playback coordination

use serde::{Deserialize, Serialize};

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Stop when the playlist ends
    #[default]
    None,

    /// Loop the current track
    Track,

    /// Loop the whole playlist
    List,
}

impl RepeatMode {
    /// Mode selected by the repeat toggle: None → List → Track → None
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::List,
            Self::List => Self::Track,
            Self::Track => Self::None,
        }
    }
}

/// How position changes reach the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeChangeMode {
    /// Report the new position right away, debounce the real seek
    Seek,

    /// Seek the transport on every request
    #[default]
    Scrub,
}

/// Replay gain selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayGainMode {
    /// Ignore replay gain metadata
    #[default]
    Disabled,

    /// Use per-track gain and peak
    Track,

    /// Use per-album gain and peak
    Album,
}

/// Position of the playing item within the playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePosition {
    /// Nothing in the playlist is considered playing
    #[default]
    None,

    /// The playing item was removed; the next prefetch restarts from the top
    StartOver,

    /// Playing item index
    At(usize),
}

impl QueuePosition {
    /// Index if this is a real position
    pub fn index(self) -> Option<usize> {
        match self {
            Self::At(index) => Some(index),
            Self::None | Self::StartOver => None,
        }
    }

    /// Index that follows this position
    ///
    /// Without a real position playback continues from the top.
    pub(crate) fn following(self) -> usize {
        match self {
            Self::At(index) => index + 1,
            Self::None | Self::StartOver => 0,
        }
    }

    /// Pull a real position back inside a list of `len` entries
    pub(crate) fn clamped(self, len: usize) -> Self {
        match self {
            Self::At(_) if len == 0 => Self::None,
            Self::At(index) => Self::At(index.min(len - 1)),
            other => other,
        }
    }
}

impl From<Option<usize>> for QueuePosition {
    fn from(index: Option<usize>) -> Self {
        index.map_or(Self::None, Self::At)
    }
}
