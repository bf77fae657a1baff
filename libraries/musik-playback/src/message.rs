//! Messages processed by the playback service
//!
//! Everything that changes service state asynchronously goes through the
//! service's `MessageQueue<Message>` and is handled one message at a time.

use crate::transport::{PlaybackState, StreamState};
use crate::types::QueuePosition;
use musik_core::TrackId;

/// Work item for the playback service
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Load preferences, restore the saved queue, attach remotes
    LoadPlaybackContext,

    /// Credit a track as played
    MarkTrackPlayed(TrackId),

    /// A transport stream changed state
    Stream {
        /// New stream state
        state: StreamState,
        /// URI of the stream
        uri: String,
    },

    /// The transport as a whole changed state
    Playback(PlaybackState),

    /// Recompute the prefetch, optionally moving the playing index first
    PrepareNextTrack {
        /// Playing index to adopt before recomputing
        index: Option<QueuePosition>,
    },

    /// Transport volume changed
    VolumeChanged,

    /// Transport position changed
    TimeChanged,

    /// Repeat mode changed
    ModeChanged,

    /// Shuffle was toggled
    Shuffled(bool),

    /// Playlist was edited in place
    NotifyEdited,

    /// Playlist was replaced
    NotifyReset,

    /// Perform the pending seek
    Seek,

    /// Recreate the output device
    ReloadOutput,
}
