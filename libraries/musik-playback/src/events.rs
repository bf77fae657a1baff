//! Playback Events
//!
//! Notifications the service emits for UI synchronization. Every event is
//! emitted from the message-processing context (or from the public method
//! that caused it) and fanned out to all subscribers over crossbeam channels.

use crate::transport::{PlaybackState, StreamState};
use crate::types::RepeatMode;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use musik_core::TrackId;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Events emitted by the playback service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// The playing track changed, or playback stopped
    TrackChanged {
        /// Playlist index now playing
        index: Option<usize>,
        /// Id of the track now playing
        track_id: Option<TrackId>,
    },

    /// Repeat or shuffle mode changed
    ModeChanged {
        /// Current repeat mode
        repeat_mode: RepeatMode,
        /// Whether the playlist is shuffled
        shuffled: bool,
    },

    /// Shuffle was toggled
    Shuffled {
        /// Whether the playlist is now shuffled
        shuffled: bool,
    },

    /// Playlist contents changed
    QueueEdited,

    /// Transport state changed
    PlaybackStateChanged {
        /// New state
        state: PlaybackState,
    },

    /// The stream at the current index changed state
    StreamStateChanged {
        /// New state
        state: StreamState,
    },

    /// Volume or mute changed
    VolumeChanged {
        /// New volume in `[0, 1]`
        volume: f64,
    },

    /// Position changed, either by the transport or by a pending seek
    TimeChanged {
        /// Position in seconds
        position: f64,
    },

    /// The track at `index` could not be loaded and playback was stopped
    PlaybackFailed {
        /// Index that failed
        index: Option<usize>,
    },
}

/// Events buffered per subscriber before new ones are dropped for it
const SUBSCRIBER_CAPACITY: usize = 1024;

/// Subscriber list for [`PlaybackEvent`]s
#[derive(Debug, Default)]
pub(crate) struct EventHub {
    subscribers: Mutex<Vec<Sender<PlaybackEvent>>>,
}

impl EventHub {
    pub(crate) fn subscribe(&self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = bounded(SUBSCRIBER_CAPACITY);
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    /// Deliver to every live subscriber, dropping those whose receiver is gone
    ///
    /// Never blocks: a subscriber whose buffer is full misses the event.
    pub(crate) fn emit(&self, event: PlaybackEvent) {
        tracing::trace!(?event, "Emitting playback event");
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Playback event subscriber is not keeping up, dropping event");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
