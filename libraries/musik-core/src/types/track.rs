//! Track domain type

use crate::types::TrackId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to a materialized track
pub type TrackPtr = Arc<Track>;

/// Replay gain metadata
///
/// Gains are in dB, peaks are linear sample values. `None` means the tag was
/// not present in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayGain {
    /// Per-track gain (dB)
    pub track_gain: Option<f32>,
    /// Per-track peak (linear)
    pub track_peak: Option<f32>,
    /// Per-album gain (dB)
    pub album_gain: Option<f32>,
    /// Per-album peak (linear)
    pub album_peak: Option<f32>,
}

/// Materialized library track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Library identifier
    pub id: TrackId,

    /// Playable resource locator (file path or stream URL)
    pub uri: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: Option<String>,

    /// Album name
    pub album: Option<String>,

    /// Duration in seconds, as stored in the library
    pub duration: Option<f64>,

    /// Loudness normalization metadata
    #[serde(default)]
    pub replay_gain: ReplayGain,
}

impl Track {
    /// Create a new track with minimal metadata
    pub fn new(id: impl Into<TrackId>, uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            title: title.into(),
            artist: None,
            album: None,
            duration: None,
            replay_gain: ReplayGain::default(),
        }
    }

    /// Builder-style duration setter
    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Builder-style replay gain setter
    #[must_use]
    pub fn with_replay_gain(mut self, replay_gain: ReplayGain) -> Self {
        self.replay_gain = replay_gain;
        self
    }
}
