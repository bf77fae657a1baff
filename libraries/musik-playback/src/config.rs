//! Tunables for the playback service

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the playback service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Track materialization timeout for playback paths (default: 5000)
    pub track_query_timeout_ms: u64,

    /// Multiplier applied to the timeout for display lookups (default: 10)
    pub ui_track_timeout_multiplier: u32,

    /// Debounce window for seeks in `Seek` mode (default: 500)
    pub seek_debounce_ms: u64,

    /// Debounce window for output reloads (default: 500)
    pub reload_output_debounce_ms: u64,

    /// Past this position `previous` restarts the track (default: 2.0)
    pub previous_grace_period_secs: f64,

    /// Added to every debounced seek target (default: 0.5)
    pub seek_offset_secs: f64,

    /// Tracks shorter than this count as played on start (default: 10.0)
    pub instant_play_threshold_secs: f64,

    /// Fraction of a track that must play before it counts (default: 0.25)
    pub played_fraction: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            track_query_timeout_ms: 5000,
            ui_track_timeout_multiplier: 10,
            seek_debounce_ms: 500,
            reload_output_debounce_ms: 500,
            previous_grace_period_secs: 2.0,
            seek_offset_secs: 0.5,
            instant_play_threshold_secs: 10.0,
            played_fraction: 0.25,
        }
    }
}

impl PlaybackConfig {
    pub(crate) fn track_timeout(&self) -> Duration {
        Duration::from_millis(self.track_query_timeout_ms)
    }

    pub(crate) fn ui_track_timeout(&self) -> Duration {
        self.track_timeout() * self.ui_track_timeout_multiplier
    }

    pub(crate) fn seek_debounce(&self) -> Duration {
        Duration::from_millis(self.seek_debounce_ms)
    }

    pub(crate) fn reload_output_debounce(&self) -> Duration {
        Duration::from_millis(self.reload_output_debounce_ms)
    }

    /// Delay before a track of `duration` seconds earns play credit
    pub(crate) fn played_delay(&self, duration: f64) -> Duration {
        Duration::try_from_secs_f64(duration * self.played_fraction).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.track_timeout(), Duration::from_secs(5));
        assert_eq!(config.ui_track_timeout(), Duration::from_secs(50));
        assert_eq!(config.seek_debounce(), Duration::from_millis(500));
        assert_eq!(config.played_delay(100.0), Duration::from_secs(25));
    }

    #[test]
    fn played_delay_tolerates_bad_durations() {
        let config = PlaybackConfig::default();
        assert_eq!(config.played_delay(-3.0), Duration::ZERO);
        assert_eq!(config.played_delay(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PlaybackConfig = toml::from_str("seek_debounce_ms = 250").unwrap();
        assert_eq!(config.seek_debounce_ms, 250);
        assert_eq!(config.track_query_timeout_ms, 5000);
    }
}
