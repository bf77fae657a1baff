//! Persisted playback preferences
//!
//! Loaded once when the service processes its startup message and written
//! back when the service is dropped, together with the queue that was
//! playing so it can be restored next time.

use crate::error::Result;
use crate::transport::TransportType;
use crate::types::{RepeatMode, ReplayGainMode, TimeChangeMode};
use musik_core::TrackId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Queue saved at shutdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQueue {
    /// Playlist contents in play order
    pub track_ids: Vec<TrackId>,

    /// Index that was playing
    pub index: Option<usize>,

    /// Position within that track (seconds)
    pub position: f64,
}

/// User-facing playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackPreferences {
    /// Output volume in `[0, 1]`
    pub volume: f64,

    /// Repeat mode
    pub repeat_mode: RepeatMode,

    /// Seek or scrub
    pub time_change_mode: TimeChangeMode,

    /// Gapless or crossfade output
    pub transport_type: TransportType,

    /// Replay gain selection
    pub replay_gain_mode: ReplayGainMode,

    /// Preamp applied to every track (dB)
    pub preamp_db: f32,

    /// Queue to restore on startup
    pub saved_queue: Option<SavedQueue>,
}

impl Default for PlaybackPreferences {
    fn default() -> Self {
        Self {
            volume: 1.0,
            repeat_mode: RepeatMode::None,
            time_change_mode: TimeChangeMode::Scrub,
            transport_type: TransportType::Gapless,
            replay_gain_mode: ReplayGainMode::Disabled,
            preamp_db: 0.0,
            saved_queue: None,
        }
    }
}

impl PlaybackPreferences {
    /// Clamp out-of-range values read from storage
    pub fn sanitized(mut self) -> Self {
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self
    }
}

/// Where preferences live
pub trait PreferenceStore: Send + Sync {
    /// Read preferences; a store with nothing saved yields defaults
    fn load(&self) -> Result<PlaybackPreferences>;

    /// Write preferences
    fn save(&self, preferences: &PlaybackPreferences) -> Result<()>;
}

/// Store that keeps preferences in memory
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    stored: Mutex<Option<PlaybackPreferences>>,
}

impl MemoryPreferenceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `preferences`
    pub fn with(preferences: PlaybackPreferences) -> Self {
        Self {
            stored: Mutex::new(Some(preferences)),
        }
    }

    /// Last saved preferences
    pub fn saved(&self) -> Option<PlaybackPreferences> {
        self.stored.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<PlaybackPreferences> {
        Ok(self.saved().unwrap_or_default().sanitized())
    }

    fn save(&self, preferences: &PlaybackPreferences) -> Result<()> {
        *self.stored.lock().unwrap_or_else(|e| e.into_inner()) = Some(preferences.clone());
        Ok(())
    }
}

/// Store backed by a TOML file
#[derive(Debug, Clone)]
pub struct TomlPreferenceStore {
    path: PathBuf,
}

impl TomlPreferenceStore {
    /// Use the file at `path`; it does not need to exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for TomlPreferenceStore {
    fn load(&self) -> Result<PlaybackPreferences> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No preferences at {}, using defaults", self.path.display());
                return Ok(PlaybackPreferences::default());
            }
            Err(e) => return Err(e.into()),
        };

        let preferences: PlaybackPreferences = toml::from_str(&contents)?;
        Ok(preferences.sanitized())
    }

    fn save(&self, preferences: &PlaybackPreferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, toml::to_string_pretty(preferences)?)?;
        tracing::debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybackError;

    #[test]
    fn memory_store_round_trips_and_sanitizes() {
        let store = MemoryPreferenceStore::new();
        assert_eq!(store.load().unwrap(), PlaybackPreferences::default());

        store
            .save(&PlaybackPreferences {
                volume: 3.0,
                repeat_mode: RepeatMode::List,
                ..PlaybackPreferences::default()
            })
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.volume, 1.0);
        assert_eq!(loaded.repeat_mode, RepeatMode::List);
    }

    #[test]
    fn toml_store_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlPreferenceStore::new(dir.path().join("nested/prefs.toml"));
        assert_eq!(store.load().unwrap(), PlaybackPreferences::default());
    }

    #[test]
    fn toml_store_persists_saved_queue() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlPreferenceStore::new(dir.path().join("nested/prefs.toml"));
        let preferences = PlaybackPreferences {
            volume: 0.4,
            time_change_mode: TimeChangeMode::Seek,
            transport_type: TransportType::Crossfade,
            replay_gain_mode: ReplayGainMode::Album,
            preamp_db: -3.0,
            saved_queue: Some(SavedQueue {
                track_ids: vec![TrackId::new(3), TrackId::new(1)],
                index: Some(1),
                position: 42.5,
            }),
            ..PlaybackPreferences::default()
        };

        store.save(&preferences).unwrap();
        assert_eq!(store.load().unwrap(), preferences);
    }

    #[test]
    fn toml_store_partial_file_and_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.toml");
        fs::write(&path, "volume = -2.0\nrepeat_mode = \"track\"\n").unwrap();

        let loaded = TomlPreferenceStore::new(&path).load().unwrap();
        assert_eq!(loaded.volume, 0.0);
        assert_eq!(loaded.repeat_mode, RepeatMode::Track);
        assert_eq!(loaded.time_change_mode, TimeChangeMode::Scrub);

        fs::write(&path, "volume = \"loud\"").unwrap();
        assert!(matches!(
            TomlPreferenceStore::new(&path).load(),
            Err(PlaybackError::PreferencesFormat(_))
        ));
    }
}
