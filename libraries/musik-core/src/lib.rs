//! musik Core
//!
//! Platform-agnostic building blocks shared by the playback core and the
//! applications built on it.
//!
//! The core crate defines:
//! - **Domain Types**: `TrackId`, `Track`, `ReplayGain`
//! - **Library Collaborator**: the `Library` trait plus an in-memory implementation
//! - **Track Lists**: `TrackList`, an id sequence that materializes records lazily
//! - **Runtime**: `MessageQueue` and `Dispatcher`, the serialized event loop
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use musik_core::{InMemoryLibrary, Track, TrackId, TrackList};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let library = Arc::new(InMemoryLibrary::with_tracks([
//!     Track::new(1, "/music/a.flac", "A"),
//!     Track::new(2, "/music/b.flac", "B"),
//! ]));
//!
//! let mut list = TrackList::new(library);
//! list.add(TrackId::new(2));
//! list.add(TrackId::new(1));
//!
//! let track = list.get_with_timeout(0, Duration::from_millis(100)).unwrap();
//! assert_eq!(track.title, "B");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod library;
pub mod runtime;
pub mod track_list;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use library::{InMemoryLibrary, Library};
pub use runtime::{Clock, Dispatcher, ManualClock, MessageQueue, MessageTarget, SystemClock};
pub use track_list::TrackList;
pub use types::{ReplayGain, Track, TrackId, TrackPtr};
