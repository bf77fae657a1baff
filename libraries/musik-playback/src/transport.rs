//! Transport collaborator
//!
//! The transport owns decoding and output. The playback service only tells it
//! what to start or prepare and listens to what it reports back. Reports are
//! pushed through an [`EventSink`] that the service installs at construction;
//! the sink does nothing but enqueue, so it is safe to call from decode or
//! output threads and from inside transport methods.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Global transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing is playing
    #[default]
    Stopped,

    /// A stream is open and waiting for `resume`
    Prepared,

    /// Audio is being output
    Playing,

    /// Output paused mid-stream
    Paused,
}

/// State of an individual stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    /// Opening and filling buffers
    Buffering,

    /// Buffers filled, ready to output
    Buffered,

    /// Stream is the one being heard
    Playing,

    /// Stream closed
    #[default]
    Stopped,

    /// Stream failed to open or decode
    Error,
}

/// How `Transport::start` begins output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    /// Start audible output right away
    Immediate,

    /// Open the stream but hold output until `resume`
    Wait,
}

/// Output strategy between consecutive tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    /// Next track starts on the sample after the current one ends
    #[default]
    Gapless,

    /// Consecutive tracks overlap with a fade
    Crossfade,
}

/// Linear gain applied when a stream starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    /// User preamp factor
    pub preamp: f32,

    /// Replay gain factor
    pub gain: f32,

    /// Reciprocal of the stream peak
    pub peak: f32,

    /// Whether `peak` comes from real metadata
    pub peak_valid: bool,
}

impl Default for Gain {
    fn default() -> Self {
        Self {
            preamp: 1.0,
            gain: 1.0,
            peak: 1.0,
            peak_valid: false,
        }
    }
}

/// Something the transport reports
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A specific stream changed state
    Stream {
        /// New stream state
        state: StreamState,
        /// URI of the stream
        uri: String,
    },

    /// The transport as a whole changed state
    Playback(PlaybackState),

    /// Volume or mute changed
    VolumeChanged,

    /// Output position changed (seconds)
    TimeChanged(f64),
}

/// Callback that receives transport events
pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Audio transport driven by the playback service
pub trait Transport: Send + Sync {
    /// Install the callback events are reported through
    fn set_event_sink(&self, sink: EventSink);

    /// Open `uri` and begin output according to `mode`
    fn start(&self, uri: &str, gain: Gain, mode: StartMode);

    /// Ready `uri` to follow the current stream; `None` clears the prefetch
    fn prepare_next_track(&self, uri: Option<&str>, gain: Gain);

    /// Pause output
    fn pause(&self);

    /// Resume output
    fn resume(&self);

    /// Stop and close every stream
    fn stop(&self);

    /// Output volume in `[0, 1]`
    fn volume(&self) -> f64;

    /// Set output volume
    fn set_volume(&self, volume: f64);

    /// Whether output is muted
    fn is_muted(&self) -> bool;

    /// Mute or unmute
    fn set_muted(&self, muted: bool);

    /// Position of the active stream in seconds
    fn position(&self) -> f64;

    /// Seek the active stream
    fn set_position(&self, seconds: f64);

    /// Duration of the active stream in seconds, `0` or less if unknown
    fn duration(&self) -> f64;

    /// URI of the active stream
    fn uri(&self) -> Option<String>;

    /// Global state
    fn playback_state(&self) -> PlaybackState;

    /// State of the active stream
    fn stream_state(&self) -> StreamState;

    /// Tear down and recreate the output device
    ///
    /// # Errors
    /// Returns `PlaybackError::Transport` if the output cannot be reopened.
    fn reload_output(&self) -> Result<()>;

    /// Output strategy, if this transport supports switching
    fn transport_type(&self) -> Option<TransportType> {
        None
    }

    /// Switch output strategy
    ///
    /// # Errors
    /// Returns `PlaybackError::Transport` if the switch fails.
    fn switch_to(&self, _transport_type: TransportType) -> Result<()> {
        Ok(())
    }
}
