//! In-memory transport
//!
//! Keeps transport state in memory, records every call it receives and can
//! report events the way an audio backend would. Used by the headless
//! harness and by tests to drive the playback service without audio output.

use crate::error::{PlaybackError, Result};
use crate::transport::{
    EventSink, Gain, PlaybackState, StartMode, StreamState, Transport, TransportEvent,
    TransportType,
};
use std::sync::{Mutex, MutexGuard};

/// A call received by [`SimulatedTransport`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    /// `start`
    Start {
        /// URI started
        uri: String,
        /// Gain applied
        gain: Gain,
        /// Start mode
        mode: StartMode,
    },
    /// `prepare_next_track`
    Prepare(Option<String>),
    /// `pause`
    Pause,
    /// `resume`
    Resume,
    /// `stop`
    Stop,
    /// `set_volume`
    SetVolume(f64),
    /// `set_muted`
    SetMuted(bool),
    /// `set_position`
    SetPosition(f64),
    /// `reload_output`
    ReloadOutput,
    /// `switch_to`
    SwitchTo(TransportType),
}

#[derive(Debug)]
struct SimState {
    playback: PlaybackState,
    stream: StreamState,
    uri: Option<String>,
    next_uri: Option<String>,
    volume: f64,
    muted: bool,
    position: f64,
    duration: f64,
    transport_type: TransportType,
    auto_events: bool,
    fail_reload: bool,
    calls: Vec<TransportCall>,
}

/// Transport that plays nothing
pub struct SimulatedTransport {
    state: Mutex<SimState>,
    sink: Mutex<Option<EventSink>>,
}

impl SimulatedTransport {
    /// Create a stopped transport that reports events for its own actions
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                playback: PlaybackState::Stopped,
                stream: StreamState::Stopped,
                uri: None,
                next_uri: None,
                volume: 1.0,
                muted: false,
                position: 0.0,
                duration: 0.0,
                transport_type: TransportType::Gapless,
                auto_events: true,
                fail_reload: false,
                calls: Vec::new(),
            }),
            sink: Mutex::new(None),
        }
    }

    /// Create a transport that only reports what [`emit`](Self::emit) sends
    pub fn silent() -> Self {
        let transport = Self::new();
        transport.lock().auto_events = false;
        transport
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Report `event` to the installed sink
    pub fn emit(&self, event: TransportEvent) {
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(sink) = sink {
            sink(event);
        }
    }

    fn emit_all(&self, events: Vec<TransportEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Duration reported for streams started from now on
    pub fn set_track_duration(&self, seconds: f64) {
        self.lock().duration = seconds;
    }

    /// Advance the position without seeking
    pub fn set_elapsed(&self, seconds: f64) {
        self.lock().position = seconds;
    }

    /// Make `reload_output` fail
    pub fn set_fail_reload(&self, fail: bool) {
        self.lock().fail_reload = fail;
    }

    /// Force the global state without reporting it
    pub fn set_playback_state(&self, state: PlaybackState) {
        self.lock().playback = state;
    }

    /// URI prepared to follow the current stream
    pub fn next_uri(&self) -> Option<String> {
        self.lock().next_uri.clone()
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// URIs passed to `start`, in order
    pub fn started_uris(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Start { uri, .. } => Some(uri.clone()),
                _ => None,
            })
            .collect()
    }

    /// Targets passed to `set_position`, in order
    pub fn seeks(&self) -> Vec<f64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::SetPosition(position) => Some(*position),
                _ => None,
            })
            .collect()
    }

    /// The current stream ran out: continue into the prepared one, or stop
    pub fn finish_track(&self) {
        let events = {
            let mut state = self.lock();
            match state.next_uri.take() {
                Some(next) => {
                    state.uri = Some(next.clone());
                    state.position = 0.0;
                    state.stream = StreamState::Playing;
                    vec![
                        TransportEvent::Stream {
                            state: StreamState::Buffering,
                            uri: next.clone(),
                        },
                        TransportEvent::Stream {
                            state: StreamState::Playing,
                            uri: next,
                        },
                    ]
                }
                None => {
                    state.uri = None;
                    state.playback = PlaybackState::Stopped;
                    state.stream = StreamState::Stopped;
                    vec![TransportEvent::Playback(PlaybackState::Stopped)]
                }
            }
        };
        self.emit_all(events);
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimulatedTransport {
    fn set_event_sink(&self, sink: EventSink) {
        *self.sink.lock().unwrap_or_else(|e| e.into_inner()) = Some(sink);
    }

    fn start(&self, uri: &str, gain: Gain, mode: StartMode) {
        let events = {
            let mut state = self.lock();
            state.calls.push(TransportCall::Start {
                uri: uri.to_string(),
                gain,
                mode,
            });
            state.uri = Some(uri.to_string());
            state.next_uri = None;
            state.position = 0.0;

            let (playback, stream) = match mode {
                StartMode::Immediate => (PlaybackState::Playing, StreamState::Playing),
                StartMode::Wait => (PlaybackState::Prepared, StreamState::Buffered),
            };
            state.playback = playback;
            state.stream = stream;

            if !state.auto_events {
                return;
            }
            vec![
                TransportEvent::Stream {
                    state: StreamState::Buffering,
                    uri: uri.to_string(),
                },
                TransportEvent::Stream {
                    state: stream,
                    uri: uri.to_string(),
                },
                TransportEvent::Playback(playback),
            ]
        };
        self.emit_all(events);
    }

    fn prepare_next_track(&self, uri: Option<&str>, _gain: Gain) {
        let mut state = self.lock();
        state.calls.push(TransportCall::Prepare(uri.map(str::to_string)));
        state.next_uri = uri.map(str::to_string);
    }

    fn pause(&self) {
        let auto = {
            let mut state = self.lock();
            state.calls.push(TransportCall::Pause);
            state.playback = PlaybackState::Paused;
            state.auto_events
        };
        if auto {
            self.emit(TransportEvent::Playback(PlaybackState::Paused));
        }
    }

    fn resume(&self) {
        let events = {
            let mut state = self.lock();
            state.calls.push(TransportCall::Resume);
            state.playback = PlaybackState::Playing;
            let was_playing = state.stream == StreamState::Playing;
            state.stream = StreamState::Playing;

            if !state.auto_events {
                return;
            }
            // A stream opened with `Wait` first becomes audible here
            let mut events = Vec::new();
            if let Some(uri) = state.uri.clone().filter(|_| !was_playing) {
                events.push(TransportEvent::Stream {
                    state: StreamState::Playing,
                    uri,
                });
            }
            events.push(TransportEvent::Playback(PlaybackState::Playing));
            events
        };
        self.emit_all(events);
    }

    fn stop(&self) {
        let auto = {
            let mut state = self.lock();
            state.calls.push(TransportCall::Stop);
            let was_stopped = state.playback == PlaybackState::Stopped;
            state.playback = PlaybackState::Stopped;
            state.stream = StreamState::Stopped;
            state.uri = None;
            state.next_uri = None;
            state.position = 0.0;
            state.auto_events && !was_stopped
        };
        if auto {
            self.emit(TransportEvent::Playback(PlaybackState::Stopped));
        }
    }

    fn volume(&self) -> f64 {
        self.lock().volume
    }

    fn set_volume(&self, volume: f64) {
        let auto = {
            let mut state = self.lock();
            state.calls.push(TransportCall::SetVolume(volume));
            state.volume = volume;
            state.auto_events
        };
        if auto {
            self.emit(TransportEvent::VolumeChanged);
        }
    }

    fn is_muted(&self) -> bool {
        self.lock().muted
    }

    fn set_muted(&self, muted: bool) {
        let auto = {
            let mut state = self.lock();
            state.calls.push(TransportCall::SetMuted(muted));
            state.muted = muted;
            state.auto_events
        };
        if auto {
            self.emit(TransportEvent::VolumeChanged);
        }
    }

    fn position(&self) -> f64 {
        self.lock().position
    }

    fn set_position(&self, seconds: f64) {
        let auto = {
            let mut state = self.lock();
            state.calls.push(TransportCall::SetPosition(seconds));
            state.position = seconds;
            state.auto_events
        };
        if auto {
            self.emit(TransportEvent::TimeChanged(seconds));
        }
    }

    fn duration(&self) -> f64 {
        let state = self.lock();
        if state.uri.is_some() {
            state.duration
        } else {
            0.0
        }
    }

    fn uri(&self) -> Option<String> {
        self.lock().uri.clone()
    }

    fn playback_state(&self) -> PlaybackState {
        self.lock().playback
    }

    fn stream_state(&self) -> StreamState {
        self.lock().stream
    }

    fn reload_output(&self) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(TransportCall::ReloadOutput);
        if state.fail_reload {
            return Err(PlaybackError::transport("simulated output unavailable"));
        }
        Ok(())
    }

    fn transport_type(&self) -> Option<TransportType> {
        Some(self.lock().transport_type)
    }

    fn switch_to(&self, transport_type: TransportType) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(TransportCall::SwitchTo(transport_type));
        state.transport_type = transport_type;
        Ok(())
    }
}
