//! Remote that reports service notifications to the log

use musik_core::Track;
use musik_playback::{PlaybackRemote, PlaybackService, PlaybackState, RepeatMode};
use std::sync::{Mutex, Weak};
use tracing::{debug, info};

#[derive(Default)]
pub struct LoggingRemote {
    service: Mutex<Option<Weak<PlaybackService>>>,
}

impl LoggingRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the remote is attached to a live service
    pub fn is_attached(&self) -> bool {
        self.service
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|service| service.strong_count() > 0)
    }
}

impl PlaybackRemote for LoggingRemote {
    fn attach(&self, service: Weak<PlaybackService>) {
        *self.service.lock().unwrap_or_else(|e| e.into_inner()) = Some(service);
        info!("Logging remote attached");
    }

    fn detach(&self) {
        self.service
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        info!("Logging remote detached");
    }

    fn on_track_changed(&self, track: Option<&Track>) {
        match track {
            Some(track) => info!("Now playing {} ({})", track.title, track.id),
            None => info!("Nothing playing"),
        }
    }

    fn on_playback_state_changed(&self, state: PlaybackState) {
        info!("Playback {:?}", state);
    }

    fn on_volume_changed(&self, volume: f64) {
        debug!("Volume {:.2}", volume);
    }

    fn on_mode_changed(&self, repeat_mode: RepeatMode, shuffled: bool) {
        info!("Repeat {:?}, shuffle {}", repeat_mode, shuffled);
    }

    fn on_play_queue_changed(&self) {
        let service = self
            .service
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(Weak::upgrade);
        if let Some(service) = service {
            debug!("Queue now holds {} tracks", service.count());
        }
    }
}
