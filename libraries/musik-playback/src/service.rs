//! Playback coordination
//!
//! `PlaybackService` maps user intent ("play index N", "next", "shuffle") to
//! transport calls and reconciles that mapping as the transport reports
//! progress and as the playlist is edited underneath it.
//!
//! # Threading
//!
//! ```text
//!  UI / remotes ──► public methods ──┬─► transport (direct delegation)
//!                                    ├─► Mutex<PlaylistState>
//!                                    └─► MessageQueue ◄── transport events
//!                                             │
//!                                             ▼
//!                                   single consumer (dispatcher thread
//!                                   or process_pending)
//! ```
//!
//! One non-reentrant mutex guards the playlist, the unshuffled copy, the
//! playing and prefetch indices, the playing track and the repeat mode.
//! Internal helpers take `&mut PlaylistState`, so holding the guard is the
//! proof that the lock is held. The transport never calls back into the
//! service directly: its events are posted to the queue and handled later.

use crate::config::PlaybackConfig;
use crate::editor::Editor;
use crate::error::Result;
use crate::events::{EventHub, PlaybackEvent};
use crate::gain::resolve_gain;
use crate::message::Message;
use crate::preferences::{MemoryPreferenceStore, PlaybackPreferences, PreferenceStore, SavedQueue};
use crate::remote::PlaybackRemote;
use crate::transport::{
    EventSink, Gain, PlaybackState, StartMode, StreamState, Transport, TransportEvent,
    TransportType,
};
use crate::types::{QueuePosition, RepeatMode, ReplayGainMode, TimeChangeMode};
use crossbeam_channel::Receiver;
use musik_core::{
    Clock, Dispatcher, Library, MessageQueue, MessageTarget, SystemClock, TrackId, TrackList,
    TrackPtr,
};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Name of the dispatcher thread
const DISPATCHER_THREAD: &str = "musik-playback";

/// State guarded by the playlist mutex
pub(crate) struct PlaylistState {
    pub(crate) playlist: TrackList,
    pub(crate) unshuffled: TrackList,
    pub(crate) index: QueuePosition,
    pub(crate) next_index: Option<usize>,
    pub(crate) playing_track: Option<TrackPtr>,
    pub(crate) repeat_mode: RepeatMode,
}

impl PlaylistState {
    /// Playing index, if it still points inside the playlist
    pub(crate) fn current_index(&self) -> Option<usize> {
        self.index.index().filter(|index| *index < self.playlist.len())
    }
}

struct Settings {
    time_change_mode: TimeChangeMode,
    seek_position: Option<f64>,
    replay_gain_mode: ReplayGainMode,
    preamp_db: f32,
    transport_type: TransportType,
}

impl From<TransportEvent> for Message {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::Stream { state, uri } => Message::Stream { state, uri },
            TransportEvent::Playback(state) => Message::Playback(state),
            TransportEvent::VolumeChanged => Message::VolumeChanged,
            TransportEvent::TimeChanged(_) => Message::TimeChanged,
        }
    }
}

// ===== Builder =====

/// Builder for [`PlaybackService`]
pub struct PlaybackServiceBuilder {
    library: Arc<dyn Library>,
    transport: Arc<dyn Transport>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    config: PlaybackConfig,
    clock: Option<Arc<dyn Clock>>,
    remotes: Vec<Arc<dyn PlaybackRemote>>,
}

impl PlaybackServiceBuilder {
    /// Where preferences are loaded from and saved to (default: in memory)
    pub fn preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    /// Timeouts and thresholds
    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Time source for delayed messages (default: wall clock)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register a remote; it is attached once the saved context is loaded
    pub fn remote(mut self, remote: Arc<dyn PlaybackRemote>) -> Self {
        self.remotes.push(remote);
        self
    }

    /// Create the service and queue its startup message
    ///
    /// Messages are not handled until [`PlaybackService::start`] spawns the
    /// dispatcher or [`PlaybackService::process_pending`] is called.
    pub fn build(self) -> Arc<PlaybackService> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let queue = Arc::new(MessageQueue::with_clock(clock));

        let sink_queue = Arc::downgrade(&queue);
        let sink: EventSink = Arc::new(move |event: TransportEvent| {
            if let Some(queue) = sink_queue.upgrade() {
                queue.post(Message::from(event));
            }
        });
        self.transport.set_event_sink(sink);

        let preferences = self
            .preferences
            .unwrap_or_else(|| Arc::new(MemoryPreferenceStore::new()));

        let service = Arc::new_cyclic(|weak_self| PlaybackService {
            weak_self: weak_self.clone(),
            state: Mutex::new(PlaylistState {
                playlist: TrackList::new(Arc::clone(&self.library)),
                unshuffled: TrackList::new(Arc::clone(&self.library)),
                index: QueuePosition::None,
                next_index: None,
                playing_track: None,
                repeat_mode: RepeatMode::None,
            }),
            settings: Mutex::new(Settings {
                time_change_mode: TimeChangeMode::Seek,
                seek_position: None,
                replay_gain_mode: ReplayGainMode::Disabled,
                preamp_db: 0.0,
                transport_type: TransportType::Gapless,
            }),
            library: self.library,
            transport: self.transport,
            preferences,
            config: self.config,
            queue,
            pending_remotes: Mutex::new(self.remotes),
            remotes: Mutex::new(Vec::new()),
            events: EventHub::default(),
            dispatcher: Mutex::new(None),
        });

        service.queue.post(Message::LoadPlaybackContext);
        service
    }
}

// ===== Service =====

/// Playback queue coordinator
pub struct PlaybackService {
    weak_self: Weak<PlaybackService>,
    library: Arc<dyn Library>,
    transport: Arc<dyn Transport>,
    preferences: Arc<dyn PreferenceStore>,
    config: PlaybackConfig,
    queue: Arc<MessageQueue<Message>>,
    state: Mutex<PlaylistState>,
    settings: Mutex<Settings>,
    pending_remotes: Mutex<Vec<Arc<dyn PlaybackRemote>>>,
    remotes: Mutex<Vec<Arc<dyn PlaybackRemote>>>,
    events: EventHub,
    dispatcher: Mutex<Option<Dispatcher<Message>>>,
}

impl PlaybackService {
    /// Start building a service around a library and a transport
    pub fn builder(
        library: Arc<dyn Library>,
        transport: Arc<dyn Transport>,
    ) -> PlaybackServiceBuilder {
        PlaybackServiceBuilder {
            library,
            transport,
            preferences: None,
            config: PlaybackConfig::default(),
            clock: None,
            remotes: Vec::new(),
        }
    }

    /// Spawn the dispatcher thread that handles queued messages
    ///
    /// Calling it again while the dispatcher runs does nothing.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.dispatcher.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(Dispatcher::spawn(
                DISPATCHER_THREAD,
                Arc::clone(&self.queue),
                self.weak_self.clone(),
            )?);
            info!("Playback dispatcher started");
        }
        Ok(())
    }

    /// Handle every due message on the calling thread
    ///
    /// Used when no dispatcher thread runs. Must not be called while an
    /// [`Editor`] is alive on the same thread. Returns how many messages
    /// were handled; always 0 once [`start`](Self::start) has been called,
    /// since the dispatcher is then the queue's only consumer.
    pub fn process_pending(&self) -> usize {
        if self
            .dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
        {
            warn!("process_pending called while the dispatcher runs, ignoring");
            return 0;
        }

        let mut handled = 0;
        loop {
            let due = self.queue.take_due();
            if due.is_empty() {
                return handled;
            }
            handled += due.len();
            for message in due {
                self.handle_message(message);
            }
        }
    }

    /// Receive every [`PlaybackEvent`] emitted from now on
    ///
    /// Each receiver buffers a bounded number of events; a receiver that is
    /// not drained misses events once its buffer is full.
    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Queue the service's messages are posted to
    pub fn queue(&self) -> &Arc<MessageQueue<Message>> {
        &self.queue
    }

    /// Library tracks are materialized through
    pub fn library(&self) -> &Arc<dyn Library> {
        &self.library
    }

    /// Transport being driven
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Timeouts and thresholds in effect
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, PlaylistState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn settings(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn for_each_remote(&self, notify: impl Fn(&dyn PlaybackRemote)) {
        let remotes = self
            .remotes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for remote in &remotes {
            notify(remote.as_ref());
        }
    }

    // ===== Playback control =====

    /// Start playing the track at `index`
    ///
    /// Returns `false` without touching the transport if the track cannot be
    /// resolved.
    pub fn play(&self, index: usize) -> bool {
        let mut state = self.lock_state();
        self.play_at(&mut state, index, StartMode::Immediate)
    }

    /// Open the track at `index` without audible output, then seek
    pub fn prepare(&self, index: usize, position: f64) -> bool {
        let mut state = self.lock_state();
        let started = self.play_at(&mut state, index, StartMode::Wait);
        if started && position > 0.0 {
            self.transport.set_position(position);
        }
        started
    }

    /// Skip forward, wrapping only under [`RepeatMode::List`]
    pub fn next(&self) -> bool {
        if self.transport.playback_state() == PlaybackState::Stopped {
            return false;
        }

        let mut state = self.lock_state();
        let count = state.playlist.len();
        let following = state.index.following();
        let target = if following < count {
            following
        } else if state.repeat_mode == RepeatMode::List && count > 0 {
            0
        } else {
            debug!("Next requested at the end of the playlist");
            return false;
        };

        self.play_at(&mut state, target, StartMode::Immediate)
    }

    /// Skip back, or restart the current track once past the grace period
    pub fn previous(&self) -> bool {
        if self.transport.playback_state() == PlaybackState::Stopped {
            return false;
        }

        let mut state = self.lock_state();
        let current = state.current_index();

        if self.transport.position() > self.config.previous_grace_period_secs {
            if let Some(index) = current {
                return self.play_at(&mut state, index, StartMode::Immediate);
            }
        }

        let count = state.playlist.len();
        let target = match current {
            Some(index) if index > 0 => index - 1,
            _ if state.repeat_mode == RepeatMode::List && count > 0 => count - 1,
            _ => return false,
        };

        self.play_at(&mut state, target, StartMode::Immediate)
    }

    /// Stop the transport
    pub fn stop(&self) {
        self.transport.stop();
    }

    /// Pause while playing, resume while paused, start from the top while stopped
    pub fn pause_or_resume(&self) {
        match self.transport.playback_state() {
            PlaybackState::Stopped => {
                let mut state = self.lock_state();
                if !state.playlist.is_empty() {
                    self.play_at(&mut state, 0, StartMode::Immediate);
                }
            }
            PlaybackState::Paused | PlaybackState::Prepared => self.transport.resume(),
            PlaybackState::Playing => self.transport.pause(),
        }
    }

    /// Transport state
    pub fn playback_state(&self) -> PlaybackState {
        self.transport.playback_state()
    }

    /// State of the active stream
    pub fn stream_state(&self) -> StreamState {
        self.transport.stream_state()
    }

    // ===== Modes =====

    /// Current repeat mode
    pub fn repeat_mode(&self) -> RepeatMode {
        self.lock_state().repeat_mode
    }

    /// Change the repeat mode
    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        let mut state = self.lock_state();
        self.set_repeat_mode_locked(&mut state, mode);
    }

    /// Cycle None → List → Track → None
    pub fn toggle_repeat_mode(&self) {
        let mut state = self.lock_state();
        let mode = state.repeat_mode.next();
        self.set_repeat_mode_locked(&mut state, mode);
    }

    fn set_repeat_mode_locked(&self, state: &mut PlaylistState, mode: RepeatMode) {
        if state.repeat_mode == mode {
            return;
        }
        info!("Repeat mode {:?} -> {:?}", state.repeat_mode, mode);
        state.repeat_mode = mode;
        self.queue.post(Message::PrepareNextTrack { index: None });
        self.queue.post(Message::ModeChanged);
    }

    /// Whether the playlist is shuffled
    pub fn is_shuffled(&self) -> bool {
        !self.lock_state().unshuffled.is_empty()
    }

    /// Shuffle the playlist, or restore its original order
    ///
    /// The playing track keeps playing; only its index changes.
    pub fn toggle_shuffle(&self) {
        let mut state = self.lock_state();
        self.toggle_shuffle_locked(&mut state);
    }

    pub(crate) fn toggle_shuffle_locked(&self, state: &mut PlaylistState) -> bool {
        let playing_id = state
            .current_index()
            .and_then(|index| state.playlist.id_at(index));

        state.playlist.clear_cache();
        state.unshuffled.clear_cache();

        if state.unshuffled.is_empty() {
            state.unshuffled.copy_from(&state.playlist);
            state.playlist.shuffle();
        } else {
            state.playlist.clear();
            state.playlist.swap_contents(&mut state.unshuffled);
        }

        let shuffled = !state.unshuffled.is_empty();
        state.next_index = None;
        if let Some(index) = playing_id.and_then(|id| state.playlist.index_of(id)) {
            state.index = QueuePosition::At(index);
        }

        info!("Shuffle {}", if shuffled { "on" } else { "off" });
        self.queue.post(Message::PrepareNextTrack { index: None });
        self.queue.post(Message::Shuffled(shuffled));
        self.queue.post(Message::NotifyEdited);
        shuffled
    }

    /// How position changes reach the transport
    pub fn time_change_mode(&self) -> TimeChangeMode {
        self.settings().time_change_mode
    }

    /// Switch between debounced seeking and immediate scrubbing
    pub fn set_time_change_mode(&self, mode: TimeChangeMode) {
        self.settings().time_change_mode = mode;
    }

    /// Replay gain selection and preamp for tracks started from now on
    pub fn set_replay_gain(&self, mode: ReplayGainMode, preamp_db: f32) {
        let mut settings = self.settings();
        settings.replay_gain_mode = mode;
        settings.preamp_db = preamp_db;
    }

    /// Output strategy applied by the next [`reload_output`](Self::reload_output)
    pub fn set_transport_type(&self, transport_type: TransportType) {
        self.settings().transport_type = transport_type;
    }

    // ===== Volume and position =====

    /// Output volume in `[0, 1]`
    pub fn volume(&self) -> f64 {
        self.transport.volume()
    }

    /// Set output volume, clamped to `[0, 1]`
    pub fn set_volume(&self, volume: f64) {
        if volume.is_finite() {
            self.transport.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    /// Whether output is muted
    pub fn is_muted(&self) -> bool {
        self.transport.is_muted()
    }

    /// Flip the mute state
    pub fn toggle_mute(&self) {
        self.transport.set_muted(!self.transport.is_muted());
    }

    /// Position in seconds, including a seek that has not reached the transport yet
    pub fn position(&self) -> f64 {
        let pending = {
            let settings = self.settings();
            match settings.time_change_mode {
                TimeChangeMode::Seek => settings.seek_position,
                TimeChangeMode::Scrub => None,
            }
        };
        pending.unwrap_or_else(|| self.transport.position())
    }

    /// Move to `seconds` into the current track
    ///
    /// In [`TimeChangeMode::Seek`] the new position is reported right away and
    /// the real seek is debounced; in [`TimeChangeMode::Scrub`] the transport
    /// seeks on every call.
    pub fn set_position(&self, seconds: f64) {
        let seconds = seconds.max(0.0);
        let mode = {
            let mut settings = self.settings();
            if settings.time_change_mode == TimeChangeMode::Seek {
                settings.seek_position = Some(seconds);
            }
            settings.time_change_mode
        };

        match mode {
            TimeChangeMode::Seek => {
                self.events
                    .emit(PlaybackEvent::TimeChanged { position: seconds });
                self.queue
                    .debounce(Message::Seek, self.config.seek_debounce());
            }
            TimeChangeMode::Scrub => self.transport.set_position(seconds),
        }
    }

    /// Duration of the current track in seconds, `0` if unknown
    pub fn duration(&self) -> f64 {
        let live = self.transport.duration();
        if live > 0.0 {
            return live;
        }

        let mut state = self.lock_state();
        state
            .current_index()
            .and_then(|index| self.track_at(&mut state, index, self.config.track_timeout()))
            .and_then(|track| track.duration)
            .unwrap_or(0.0)
    }

    // ===== Playlist access =====

    /// Number of playlist entries
    pub fn count(&self) -> usize {
        self.lock_state().playlist.len()
    }

    /// Playing index
    pub fn index(&self) -> Option<usize> {
        self.lock_state().current_index()
    }

    /// Index the transport was asked to prepare
    pub fn next_index(&self) -> Option<usize> {
        self.lock_state().next_index
    }

    /// Track at `index`, for display
    pub fn track(&self, index: usize) -> Option<TrackPtr> {
        let mut state = self.lock_state();
        self.track_at(&mut state, index, self.config.ui_track_timeout())
    }

    /// Track last reported as playing
    pub fn playing_track(&self) -> Option<TrackPtr> {
        self.lock_state().playing_track.clone()
    }

    /// Detached copy of the playlist
    pub fn clone_playlist(&self) -> TrackList {
        self.lock_state().playlist.clone()
    }

    /// Overwrite `target` with the playlist's contents
    pub fn copy_to(&self, target: &mut TrackList) {
        target.copy_from(&self.lock_state().playlist);
    }

    /// Edit the playlist in place
    ///
    /// The returned editor holds the playlist lock until dropped.
    pub fn edit(&self) -> Editor<'_> {
        Editor::new(self, self.lock_state())
    }

    /// Replace the playlist, keeping the playing track if `source` contains it
    pub fn copy_from(&self, source: &TrackList) {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        state.playlist.copy_from(source);
        state.unshuffled.clear();
        state.index = QueuePosition::None;
        state.next_index = None;

        let playing_id = state.playing_track.as_ref().map(|track| track.id);
        if let Some(index) = playing_id.and_then(|id| state.playlist.index_of(id)) {
            state.index = QueuePosition::At(index);
            self.queue.post(Message::PrepareNextTrack {
                index: Some(state.index),
            });
        }

        self.queue.post(Message::NotifyEdited);
    }

    /// Replace the playlist and start playing at `index`
    pub fn play_list(&self, source: &TrackList, index: usize) {
        let mut state = self.lock_state();
        state.playlist.copy_from(source);
        state.unshuffled.clear();
        if index <= state.playlist.len() {
            self.play_at(&mut state, index, StartMode::Immediate);
        }
        self.queue.post(Message::NotifyReset);
    }

    /// Replace the playlist without interrupting the playing track
    ///
    /// `index` is where the playing track is expected in `source`; the whole
    /// list is searched if it is not there. Returns `false` only if `source`
    /// is empty.
    pub fn hot_swap(&self, source: &TrackList, index: usize) -> bool {
        if source.is_empty() {
            return false;
        }

        let mut guard = self.lock_state();
        let state = &mut *guard;

        let found = state.playing_track.as_ref().and_then(|playing| {
            if source.id_at(index) == Some(playing.id) {
                Some(index)
            } else {
                source.index_of(playing.id)
            }
        });

        state.playlist.copy_from(source);
        state.unshuffled.clear();
        state.index = QueuePosition::from(found);
        state.next_index = None;

        match found {
            Some(index) => {
                debug!("Hot swap kept the playing track at {}", index);
                self.queue.post(Message::PrepareNextTrack {
                    index: Some(QueuePosition::At(index)),
                });
            }
            None => debug!("Hot swap dropped the playing track"),
        }

        self.queue.post(Message::NotifyEdited);
        true
    }

    /// The library was re-indexed; forget memoized tracks
    pub fn on_library_changed(&self) {
        let mut state = self.lock_state();
        state.playlist.clear_cache();
        state.unshuffled.clear_cache();
    }

    /// Recreate the output device (debounced)
    pub fn reload_output(&self) {
        self.queue
            .debounce(Message::ReloadOutput, self.config.reload_output_debounce());
    }

    // ===== Locked helpers =====

    fn track_at(
        &self,
        state: &mut PlaylistState,
        index: usize,
        timeout: Duration,
    ) -> Option<TrackPtr> {
        if index >= state.playlist.len() || !self.library.is_connected() {
            return None;
        }
        match state.playlist.get_with_timeout(index, timeout) {
            Ok(track) => Some(track),
            Err(e) => {
                warn!("Failed to load track at {}: {}", index, e);
                None
            }
        }
    }

    fn uri_at(&self, state: &mut PlaylistState, index: usize) -> Option<String> {
        let track = self.track_at(state, index, self.config.track_timeout())?;
        let uri = self.library.track_uri(&track);
        (!uri.is_empty()).then_some(uri)
    }

    fn gain_at(&self, state: &mut PlaylistState, index: usize) -> Gain {
        let (mode, preamp_db) = {
            let settings = self.settings();
            (settings.replay_gain_mode, settings.preamp_db)
        };
        let track = match mode {
            ReplayGainMode::Disabled => None,
            ReplayGainMode::Track | ReplayGainMode::Album => {
                self.track_at(state, index, self.config.track_timeout())
            }
        };
        resolve_gain(track.as_deref(), mode, preamp_db)
    }

    fn play_at(&self, state: &mut PlaylistState, index: usize, mode: StartMode) -> bool {
        let index = index.min(state.playlist.len());
        let Some(uri) = self.uri_at(state, index) else {
            debug!("Nothing playable at {}", index);
            return false;
        };

        let gain = self.gain_at(state, index);
        info!("Starting {} ({:?}) at {}", uri, mode, index);
        self.transport.start(&uri, gain, mode);
        state.next_index = None;
        state.index = QueuePosition::At(index);
        true
    }

    fn prepare_at(&self, state: &mut PlaylistState, index: usize) {
        let uri = self.uri_at(state, index);
        let gain = match uri {
            Some(_) => self.gain_at(state, index),
            None => Gain::default(),
        };
        debug!("Preparing {:?} as next track ({})", uri, index);
        self.transport.prepare_next_track(uri.as_deref(), gain);
    }

    /// Decide what the transport should play after the current track
    pub(crate) fn prepare_next_track_locked(&self, state: &mut PlaylistState) {
        let count = state.playlist.len();
        if count == 0 {
            state.next_index = None;
            self.transport.prepare_next_track(None, Gain::default());
            return;
        }

        if state.repeat_mode == RepeatMode::Track {
            if let Some(index) = state.current_index() {
                state.next_index = Some(index);
                self.prepare_at(state, index);
                return;
            }
        }

        if state.index == QueuePosition::StartOver {
            state.index = QueuePosition::None;
            state.next_index = Some(0);
            self.prepare_at(state, 0);
            return;
        }

        let following = state.index.following();
        let next = if following < count {
            Some(following)
        } else if state.repeat_mode == RepeatMode::List {
            Some(0)
        } else {
            None
        };

        match next {
            Some(next) if state.next_index != Some(next) => {
                state.next_index = Some(next);
                self.prepare_at(state, next);
            }
            Some(_) => {}
            None => {
                state.next_index = None;
                self.transport.prepare_next_track(None, Gain::default());
            }
        }
    }

    // ===== Message handling =====

    fn handle_message(&self, message: Message) {
        match message {
            Message::LoadPlaybackContext => self.load_playback_context(),
            Message::MarkTrackPlayed(id) => self.mark_track_played(id),
            Message::Stream { state, uri } => self.on_stream_event(state, &uri),
            Message::Playback(state) => self.on_playback_event(state),
            Message::PrepareNextTrack { index } => {
                let mut state = self.lock_state();
                if let Some(position) = index {
                    state.index = position.clamped(state.playlist.len());
                    state.next_index = None;
                }
                if self.transport.playback_state() != PlaybackState::Stopped {
                    self.prepare_next_track_locked(&mut state);
                }
            }
            Message::VolumeChanged => {
                let volume = self.transport.volume();
                self.for_each_remote(|remote| remote.on_volume_changed(volume));
                self.events.emit(PlaybackEvent::VolumeChanged { volume });
            }
            Message::TimeChanged => {
                let position = self.transport.position();
                self.for_each_remote(|remote| remote.on_time_changed(position));
                self.events.emit(PlaybackEvent::TimeChanged { position });
            }
            Message::ModeChanged => {
                let (repeat_mode, shuffled) = {
                    let state = self.lock_state();
                    (state.repeat_mode, !state.unshuffled.is_empty())
                };
                self.for_each_remote(|remote| remote.on_mode_changed(repeat_mode, shuffled));
                self.events.emit(PlaybackEvent::ModeChanged {
                    repeat_mode,
                    shuffled,
                });
            }
            Message::Shuffled(shuffled) => {
                let repeat_mode = self.repeat_mode();
                self.for_each_remote(|remote| remote.on_mode_changed(repeat_mode, shuffled));
                self.events.emit(PlaybackEvent::Shuffled { shuffled });
            }
            Message::NotifyEdited | Message::NotifyReset => {
                self.for_each_remote(|remote| remote.on_play_queue_changed());
                self.events.emit(PlaybackEvent::QueueEdited);
            }
            Message::Seek => {
                let pending = self.settings().seek_position.take();
                if let Some(position) = pending {
                    debug!("Seeking to {}", position);
                    self.transport
                        .set_position(position + self.config.seek_offset_secs);
                }
            }
            Message::ReloadOutput => self.reload_output_now(),
        }
    }

    fn load_playback_context(&self) {
        let preferences = self.preferences.load().unwrap_or_else(|e| {
            warn!("Failed to load playback preferences, using defaults: {}", e);
            PlaybackPreferences::default()
        });

        self.transport.set_volume(preferences.volume);
        {
            let mut settings = self.settings();
            settings.time_change_mode = preferences.time_change_mode;
            settings.replay_gain_mode = preferences.replay_gain_mode;
            settings.preamp_db = preferences.preamp_db;
            settings.transport_type = preferences.transport_type;
        }
        self.set_repeat_mode(preferences.repeat_mode);

        if let Some(saved) = preferences.saved_queue {
            let mut state = self.lock_state();
            state.playlist.set_ids(saved.track_ids);
            state.unshuffled.clear();
            let count = state.playlist.len();
            info!("Restored queue of {} tracks", count);

            if let Some(index) = saved.index.filter(|index| *index < count) {
                if self.play_at(&mut state, index, StartMode::Wait) && saved.position > 0.0 {
                    self.transport.set_position(saved.position);
                }
            }
            self.queue.post(Message::NotifyReset);
        }

        let pending = std::mem::take(
            &mut *self
                .pending_remotes
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        );
        for remote in &pending {
            remote.attach(self.weak_self.clone());
        }
        if !pending.is_empty() {
            debug!("Attached {} remotes", pending.len());
        }
        self.remotes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(pending);
    }

    fn mark_track_played(&self, id: TrackId) {
        let playing = self
            .lock_state()
            .playing_track
            .clone()
            .filter(|track| track.id == id);

        let track = match playing {
            Some(track) => Some(track),
            None => match self.library.track(id, self.config.track_timeout()) {
                Ok(track) => Some(track),
                Err(e) => {
                    warn!("Cannot credit track {}: {}", id, e);
                    None
                }
            },
        };

        if let Some(track) = track {
            info!("Marking track {} played", id);
            self.library.mark_played(&track);
        }
    }

    /// Record a track change and schedule its play credit
    ///
    /// Any credit still pending for the previous track is cancelled.
    /// `playing` is whether the stream has actually reached audible output.
    fn on_track_changed(&self, index: Option<usize>, track: Option<TrackPtr>, playing: bool) {
        self.lock_state().playing_track = track.clone();
        self.queue
            .remove(|message| matches!(message, Message::MarkTrackPlayed(_)));

        self.events.emit(PlaybackEvent::TrackChanged {
            index,
            track_id: track.as_ref().map(|track| track.id),
        });

        if let Some(track) = track.as_ref().filter(|_| playing) {
            let mut duration = self.transport.duration();
            if duration <= 0.0 {
                duration = track.duration.unwrap_or(0.0);
            }

            if duration > 0.0 && duration < self.config.instant_play_threshold_secs {
                info!("Marking short track {} played", track.id);
                self.library.mark_played(track);
            } else {
                self.queue.post_delayed(
                    Message::MarkTrackPlayed(track.id),
                    self.config.played_delay(duration),
                );
            }
        }

        self.for_each_remote(|remote| remote.on_track_changed(track.as_deref()));
    }

    fn on_stream_event(&self, stream_state: StreamState, uri: &str) {
        debug!("Stream {:?}: {}", stream_state, uri);

        if matches!(
            stream_state,
            StreamState::Buffering | StreamState::Buffered | StreamState::Playing
        ) {
            let resolved = {
                let mut guard = self.lock_state();
                let state = &mut *guard;

                if let Some(next) = state.next_index {
                    if next >= state.playlist.len() {
                        debug!("Prefetch index {} went stale, clearing it", next);
                        state.next_index = None;
                        self.transport.prepare_next_track(None, Gain::default());
                        return;
                    }
                    if self.uri_at(state, next).as_deref() == Some(uri) {
                        state.index = QueuePosition::At(next);
                        state.next_index = None;
                    }
                }

                state.current_index().map(|index| {
                    (index, self.track_at(state, index, self.config.track_timeout()))
                })
            };

            match resolved {
                Some((index, Some(track))) => {
                    self.on_track_changed(
                        Some(index),
                        Some(track),
                        stream_state == StreamState::Playing,
                    );
                }
                Some((index, None)) => {
                    error!("Track at {} could not be loaded, stopping", index);
                    self.events
                        .emit(PlaybackEvent::PlaybackFailed { index: Some(index) });
                    self.stop();
                    return;
                }
                None => {
                    debug!("Stream {} has no playlist entry, stopping", uri);
                    self.stop();
                    return;
                }
            }

            if stream_state == StreamState::Playing {
                let mut state = self.lock_state();
                self.prepare_next_track_locked(&mut state);
            }
        }

        let current_uri = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            state
                .current_index()
                .and_then(|index| self.uri_at(state, index))
        };
        if current_uri.as_deref() == Some(uri) {
            self.events.emit(PlaybackEvent::StreamStateChanged {
                state: stream_state,
            });
        }
    }

    fn on_playback_event(&self, playback_state: PlaybackState) {
        debug!("Playback {:?}", playback_state);

        match playback_state {
            PlaybackState::Stopped => self.on_track_changed(None, None, false),
            PlaybackState::Prepared => {
                let transport_uri = self.transport.uri();
                let prepared = {
                    let mut guard = self.lock_state();
                    let state = &mut *guard;
                    state.current_index().and_then(|index| {
                        (self.uri_at(state, index) == transport_uri).then(|| {
                            (index, self.track_at(state, index, self.config.track_timeout()))
                        })
                    })
                };

                match prepared {
                    Some((index, Some(track))) => {
                        let playing = self.transport.stream_state() == StreamState::Playing;
                        self.on_track_changed(Some(index), Some(track), playing);
                    }
                    Some((index, None)) => {
                        error!("Prepared track at {} could not be loaded, stopping", index);
                        self.events
                            .emit(PlaybackEvent::PlaybackFailed { index: Some(index) });
                        self.stop();
                    }
                    None => {}
                }
            }
            PlaybackState::Playing | PlaybackState::Paused => {}
        }

        self.for_each_remote(|remote| remote.on_playback_state_changed(playback_state));
        self.events.emit(PlaybackEvent::PlaybackStateChanged {
            state: playback_state,
        });
    }

    fn reload_output_now(&self) {
        let playback_state = self.transport.playback_state();
        let index = self.index();
        let position = self.position();
        let desired = self.settings().transport_type;

        if let Some(current) = self.transport.transport_type() {
            if current != desired {
                info!("Switching transport {:?} -> {:?}", current, desired);
                if let Err(e) = self.transport.switch_to(desired) {
                    error!("Failed to switch transport: {}", e);
                    self.stop();
                    return;
                }
            }
        }

        if playback_state == PlaybackState::Stopped {
            if let Err(e) = self.transport.reload_output() {
                error!("Failed to reload output: {}", e);
            }
            return;
        }

        self.stop();
        if let Err(e) = self.transport.reload_output() {
            error!("Failed to reload output: {}", e);
            return;
        }

        let Some(index) = index else {
            return;
        };

        let mode = match playback_state {
            PlaybackState::Paused | PlaybackState::Prepared => StartMode::Wait,
            PlaybackState::Playing | PlaybackState::Stopped => StartMode::Immediate,
        };

        let mut state = self.lock_state();
        if self.play_at(&mut state, index, mode) {
            if position > 0.0 {
                self.transport.set_position(position);
            }
            if mode == StartMode::Wait {
                self.transport.pause();
            }
            info!("Output reloaded, resumed at {} ({}s)", index, position);
        }
    }

    fn save_playback_context(&self) {
        let position = self.position();
        let (repeat_mode, saved_queue) = {
            let state = self.lock_state();
            let saved_queue = (!state.playlist.is_empty()).then(|| SavedQueue {
                track_ids: state.playlist.ids().to_vec(),
                index: state.current_index(),
                position,
            });
            (state.repeat_mode, saved_queue)
        };

        let preferences = {
            let settings = self.settings();
            PlaybackPreferences {
                volume: self.transport.volume(),
                repeat_mode,
                time_change_mode: settings.time_change_mode,
                transport_type: settings.transport_type,
                replay_gain_mode: settings.replay_gain_mode,
                preamp_db: settings.preamp_db,
                saved_queue,
            }
            .sanitized()
        };

        if let Err(e) = self.preferences.save(&preferences) {
            error!("Failed to save playback preferences: {}", e);
        }
    }
}

impl MessageTarget<Message> for PlaybackService {
    fn process_message(&self, message: Message) {
        self.handle_message(message);
    }
}

impl Drop for PlaybackService {
    fn drop(&mut self) {
        let dispatcher = self
            .dispatcher
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(mut dispatcher) = dispatcher {
            dispatcher.stop();
        }

        self.save_playback_context();
        self.transport.stop();

        let remotes = std::mem::take(self.remotes.get_mut().unwrap_or_else(|e| e.into_inner()));
        for remote in &remotes {
            remote.detach();
        }

        self.queue.shutdown();
        debug!("Playback service shut down");
    }
}
