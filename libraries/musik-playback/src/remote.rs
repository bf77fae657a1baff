//! Remote-control observers
//!
//! A remote is anything that mirrors playback state somewhere else (media
//! keys, a network control surface, a scrobbler). Remotes are handed to the
//! service at construction, attached once the service has loaded its saved
//! context, and called from the message-processing context. Callbacks should
//! return quickly.

use crate::service::PlaybackService;
use crate::transport::PlaybackState;
use crate::types::RepeatMode;
use musik_core::Track;
use std::sync::Weak;

/// Observer of playback state
///
/// Every method has a no-op default so a remote only implements what it
/// cares about.
pub trait PlaybackRemote: Send + Sync {
    /// Called once the service is ready; keep the handle to issue commands
    fn attach(&self, _service: Weak<PlaybackService>) {}

    /// Called when the service shuts down
    fn detach(&self) {}

    /// The playing track changed; `None` when playback stopped
    fn on_track_changed(&self, _track: Option<&Track>) {}

    /// Transport state changed
    fn on_playback_state_changed(&self, _state: PlaybackState) {}

    /// Volume or mute changed
    fn on_volume_changed(&self, _volume: f64) {}

    /// Repeat or shuffle mode changed
    fn on_mode_changed(&self, _repeat_mode: RepeatMode, _shuffled: bool) {}

    /// Transport position changed
    fn on_time_changed(&self, _position: f64) {}

    /// Playlist contents changed
    fn on_play_queue_changed(&self) {}
}
