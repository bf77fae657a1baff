//! Library collaborator
//!
//! The playback core never queries storage directly. It asks a `Library` to
//! materialize tracks by id (with a timeout, since lookups may hit disk or a
//! remote server) and to resolve a playable URI for a track.

use crate::error::{CoreError, Result};
use crate::types::{Track, TrackId, TrackPtr};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

/// Track lookup and bookkeeping provider
pub trait Library: Send + Sync {
    /// Whether the library can currently serve lookups
    fn is_connected(&self) -> bool {
        true
    }

    /// Materialize a track, waiting at most `timeout`
    ///
    /// # Errors
    /// `TrackUnavailable` if the id is unknown or the lookup did not finish in time,
    /// `Disconnected` if the library is offline.
    fn track(&self, id: TrackId, timeout: Duration) -> Result<TrackPtr>;

    /// Resolve the URI handed to the transport for a track
    fn track_uri(&self, track: &Track) -> String {
        track.uri.clone()
    }

    /// Record that a track was played (play count, scrobble)
    fn mark_played(&self, track: &Track);
}

/// Library backed by a hash map
///
/// Used by the headless harness and by tests. Supports simulated lookup
/// latency and disconnection so timeout handling can be exercised.
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    tracks: RwLock<HashMap<TrackId, TrackPtr>>,
    played: Mutex<Vec<TrackId>>,
    latency: RwLock<Duration>,
    offline: RwLock<bool>,
}

impl InMemoryLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library pre-populated with tracks
    pub fn with_tracks(tracks: impl IntoIterator<Item = Track>) -> Self {
        let library = Self::new();
        for track in tracks {
            library.insert(track);
        }
        library
    }

    /// Add or replace a track
    pub fn insert(&self, track: Track) {
        let mut tracks = self.tracks.write().unwrap_or_else(|e| e.into_inner());
        tracks.insert(track.id, TrackPtr::new(track));
    }

    /// Remove a track, making later lookups fail
    pub fn remove(&self, id: TrackId) -> Option<TrackPtr> {
        let mut tracks = self.tracks.write().unwrap_or_else(|e| e.into_inner());
        tracks.remove(&id)
    }

    /// Simulate slow lookups
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    /// Simulate the library going offline
    pub fn set_connected(&self, connected: bool) {
        *self.offline.write().unwrap_or_else(|e| e.into_inner()) = !connected;
    }

    /// Ids passed to `mark_played`, oldest first
    pub fn played(&self) -> Vec<TrackId> {
        self.played.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of tracks in the library
    pub fn len(&self) -> usize {
        self.tracks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the library has no tracks
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Library for InMemoryLibrary {
    fn is_connected(&self) -> bool {
        !*self.offline.read().unwrap_or_else(|e| e.into_inner())
    }

    fn track(&self, id: TrackId, timeout: Duration) -> Result<TrackPtr> {
        if !self.is_connected() {
            return Err(CoreError::Disconnected);
        }

        let latency = *self.latency.read().unwrap_or_else(|e| e.into_inner());
        if latency > timeout {
            // The lookup would still be running when the caller gives up
            let started = Instant::now();
            std::thread::sleep(timeout);
            tracing::debug!(
                "Lookup for track {} timed out after {:?}",
                id,
                started.elapsed()
            );
            return Err(CoreError::TrackUnavailable(id));
        }
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        self.tracks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CoreError::TrackUnavailable(id))
    }

    fn mark_played(&self, track: &Track) {
        self.played
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(track.id);
    }
}
