//! Musik - Playback Coordination
//!
//! The playback queue core: owns the live playlist, maps "play index N" to
//! transport calls, and keeps the playing and prefetch indices right while
//! the transport reports progress and the playlist is edited concurrently.
//!
//! This crate provides:
//! - `PlaybackService`: play/next/previous, shuffle and repeat, volume,
//!   debounced seeking, bulk playlist replacement and output reloads
//! - `Editor`: scoped, lock-holding playlist mutation that tracks where the
//!   playing item ends up
//! - Gapless prefetch planning (`Transport::prepare_next_track`)
//! - Play credit after 25% of a track (or immediately for short tracks)
//! - Replay gain resolution
//! - Persisted preferences and queue restore
//! - `PlaybackEvent` fan-out and `PlaybackRemote` observers
//!
//! # Architecture
//!
//! `musik-playback` never decodes audio. Output is a [`Transport`]
//! implementation and track lookup is a [`musik_core::Library`]; both are
//! traits supplied by the embedding application. All asynchronous work is
//! serialized through one `MessageQueue`, handled either by a dispatcher
//! thread ([`PlaybackService::start`]) or on demand
//! ([`PlaybackService::process_pending`]).
//!
//! # Example: Basic Playback
//!
//! ```rust
//! use musik_core::{InMemoryLibrary, Track, TrackId, TrackList};
//! use musik_playback::{PlaybackService, SimulatedTransport};
//! use std::sync::Arc;
//!
//! let library = Arc::new(InMemoryLibrary::with_tracks(
//!     (1..=3i64).map(|i| Track::new(i, format!("/music/{i}.flac"), format!("Track {i}"))),
//! ));
//! let transport = Arc::new(SimulatedTransport::new());
//! let service = PlaybackService::builder(library.clone(), transport.clone()).build();
//! service.process_pending();
//!
//! let tracks = TrackList::with_ids(library, (1..=3).map(TrackId::new).collect());
//! service.play_list(&tracks, 0);
//! service.process_pending();
//!
//! assert_eq!(service.index(), Some(0));
//! assert_eq!(service.next_index(), Some(1));
//! assert!(service.next());
//! ```
//!
//! # Example: Editing the Live Playlist
//!
//! ```rust
//! # use musik_core::{InMemoryLibrary, Track, TrackId, TrackList};
//! # use musik_playback::{PlaybackService, SimulatedTransport};
//! # use std::sync::Arc;
//! # let library = Arc::new(InMemoryLibrary::with_tracks(
//! #     (1..=5i64).map(|i| Track::new(i, format!("/music/{i}.flac"), "t")),
//! # ));
//! # let service = PlaybackService::builder(library.clone(), Arc::new(SimulatedTransport::new())).build();
//! # service.play_list(&TrackList::with_ids(library, (1..=5).map(TrackId::new).collect()), 2);
//! # service.process_pending();
//! {
//!     let mut editor = service.edit();
//!     editor.delete(0).unwrap();
//! } // lock released, reconciliation queued
//! service.process_pending();
//! assert_eq!(service.index(), Some(1));
//! ```

mod config;
mod editor;
mod error;
mod events;
mod gain;
mod message;
mod preferences;
mod remote;
mod service;
mod simulated;
mod transport;
pub mod types;

// Public exports
pub use config::PlaybackConfig;
pub use editor::Editor;
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use gain::resolve_gain;
pub use message::Message;
pub use preferences::{
    MemoryPreferenceStore, PlaybackPreferences, PreferenceStore, SavedQueue, TomlPreferenceStore,
};
pub use remote::PlaybackRemote;
pub use service::{PlaybackService, PlaybackServiceBuilder};
pub use simulated::{SimulatedTransport, TransportCall};
pub use transport::{
    EventSink, Gain, PlaybackState, StartMode, StreamState, Transport, TransportEvent,
    TransportType,
};
pub use types::{QueuePosition, RepeatMode, ReplayGainMode, TimeChangeMode};
