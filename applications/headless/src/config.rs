//! Headless harness configuration

use crate::error::Result;
use musik_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HeadlessConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub library: LibrarySettings,

    /// Where preferences and the playback context are kept; in memory if unset
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibrarySettings {
    /// Number of synthetic tracks to seed
    #[serde(default = "default_tracks")]
    pub tracks: usize,

    /// Stored duration of every synthetic track (seconds)
    #[serde(default = "default_track_seconds")]
    pub track_seconds: f64,

    /// Simulated lookup latency
    #[serde(default)]
    pub latency_ms: u64,
}

impl HeadlessConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables use the `MUSIK_` prefix and `__` between
    /// sections, e.g. `MUSIK_PLAYBACK__SEEK_DEBOUNCE_MS=250`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path.to_path_buf()));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("MUSIK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }
}

fn default_tracks() -> usize {
    20
}

fn default_track_seconds() -> f64 {
    180.0
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            tracks: default_tracks(),
            track_seconds: default_track_seconds(),
            latency_ms: 0,
        }
    }
}
