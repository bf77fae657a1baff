//! Shared fixtures for playback service tests
#![allow(dead_code)]

use crossbeam_channel::Receiver;
use musik_core::{InMemoryLibrary, ManualClock, Track, TrackId, TrackList};
use musik_playback::{
    MemoryPreferenceStore, PlaybackEvent, PlaybackPreferences, PlaybackRemote, PlaybackService,
    PlaybackState, RepeatMode, SimulatedTransport,
};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Stored duration of every fixture track (seconds)
pub const TRACK_SECONDS: f64 = 180.0;

/// URI of fixture track `id`
pub fn uri(id: i64) -> String {
    format!("/music/{id}.flac")
}

/// Ids as `TrackId`s
pub fn ids(values: &[i64]) -> Vec<TrackId> {
    values.iter().copied().map(TrackId::new).collect()
}

/// Library holding tracks `1..=count`
pub fn library(count: i64) -> Arc<InMemoryLibrary> {
    Arc::new(InMemoryLibrary::with_tracks((1..=count).map(|id| {
        Track::new(id, uri(id), format!("Track {id}")).with_duration(TRACK_SECONDS)
    })))
}

/// Service wired to a simulated transport, an in-memory library and a
/// manual clock. Nothing happens until `settle` or `advance` is called.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub library: Arc<InMemoryLibrary>,
    pub transport: Arc<SimulatedTransport>,
    pub preferences: Arc<MemoryPreferenceStore>,
    pub service: Arc<PlaybackService>,
    pub events: Receiver<PlaybackEvent>,
}

impl Harness {
    /// Library of `count` tracks, default preferences, startup handled
    pub fn new(count: i64) -> Self {
        Self::with_preferences(count, PlaybackPreferences::default())
    }

    /// Same as `new`, starting from saved `preferences`
    pub fn with_preferences(count: i64, preferences: PlaybackPreferences) -> Self {
        Self::build(count, preferences, Vec::new())
    }

    /// Same as `new`, with remotes registered
    pub fn with_remotes(count: i64, remotes: Vec<Arc<dyn PlaybackRemote>>) -> Self {
        Self::build(count, PlaybackPreferences::default(), remotes)
    }

    fn build(
        count: i64,
        preferences: PlaybackPreferences,
        remotes: Vec<Arc<dyn PlaybackRemote>>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new());
        let library = library(count);
        let transport = Arc::new(SimulatedTransport::new());
        let store = Arc::new(MemoryPreferenceStore::with(preferences));

        let mut builder = PlaybackService::builder(library.clone(), transport.clone())
            .preferences(store.clone())
            .clock(clock.clone());
        for remote in remotes {
            builder = builder.remote(remote);
        }
        let service = builder.build();
        let events = service.subscribe();

        let harness = Self {
            clock,
            library,
            transport,
            preferences: store,
            service,
            events,
        };
        harness.settle();
        harness.drain_events();
        harness
    }

    /// Handle every message that is due
    pub fn settle(&self) -> usize {
        self.service.process_pending()
    }

    /// Move the clock forward, then settle
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
        self.settle();
    }

    /// Track list over the fixture library
    pub fn list(&self, values: &[i64]) -> TrackList {
        TrackList::with_ids(self.library.clone(), ids(values))
    }

    /// Replace the playlist with `values`, start at `index` and settle
    pub fn play(&self, values: &[i64], index: usize) {
        self.service.play_list(&self.list(values), index);
        self.settle();
    }

    /// Live playlist ids
    pub fn playlist(&self) -> Vec<TrackId> {
        self.service.clone_playlist().ids().to_vec()
    }

    /// Id of the track the service reports as playing
    pub fn playing_id(&self) -> Option<TrackId> {
        self.service.playing_track().map(|track| track.id)
    }

    /// Events emitted since the last drain
    pub fn drain_events(&self) -> Vec<PlaybackEvent> {
        self.events.try_iter().collect()
    }

    /// Whether the service is playing something
    pub fn is_playing(&self) -> bool {
        self.service.playback_state() == PlaybackState::Playing
    }
}

/// Remote that records every notification
#[derive(Default)]
pub struct RecordingRemote {
    pub log: Mutex<Vec<String>>,
    pub service: Mutex<Option<Weak<PlaybackService>>>,
}

impl RecordingRemote {
    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl PlaybackRemote for RecordingRemote {
    fn attach(&self, service: Weak<PlaybackService>) {
        *self.service.lock().unwrap() = Some(service);
        self.record("attach".into());
    }

    fn detach(&self) {
        self.record("detach".into());
    }

    fn on_track_changed(&self, track: Option<&Track>) {
        self.record(format!("track {:?}", track.map(|t| t.id.get())));
    }

    fn on_playback_state_changed(&self, state: PlaybackState) {
        self.record(format!("state {state:?}"));
    }

    fn on_volume_changed(&self, volume: f64) {
        self.record(format!("volume {volume}"));
    }

    fn on_mode_changed(&self, repeat_mode: RepeatMode, shuffled: bool) {
        self.record(format!("mode {repeat_mode:?} {shuffled}"));
    }

    fn on_play_queue_changed(&self) {
        self.record("queue".into());
    }
}
