//! Scoped playlist editing
//!
//! An [`Editor`] holds the playlist lock for its whole lifetime and tracks
//! where the playing item ends up as edits are applied. Nothing is
//! reconciled until it is dropped: if anything changed, the drop posts a
//! prefetch recompute carrying the final playing position and a queue-edited
//! notification, then releases the lock.

use crate::error::Result;
use crate::message::Message;
use crate::service::{PlaybackService, PlaylistState};
use crate::types::QueuePosition;
use musik_core::TrackId;
use std::sync::MutexGuard;
use tracing::debug;

/// Exclusive handle for editing the live playlist
pub struct Editor<'a> {
    service: &'a PlaybackService,
    state: MutexGuard<'a, PlaylistState>,
    play_index: QueuePosition,
    next_invalidated: bool,
    edited: bool,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(service: &'a PlaybackService, state: MutexGuard<'a, PlaylistState>) -> Self {
        let play_index = state.index;
        Self {
            service,
            state,
            play_index,
            next_invalidated: false,
            edited: false,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.state.playlist.len()
    }

    /// Whether the playlist is empty
    pub fn is_empty(&self) -> bool {
        self.state.playlist.is_empty()
    }

    /// Id at `index`
    pub fn id_at(&self, index: usize) -> Option<TrackId> {
        self.state.playlist.id_at(index)
    }

    /// Where the playing item sits after the edits so far
    pub fn play_index(&self) -> QueuePosition {
        self.play_index
    }

    /// Insert `id` before `at`; past the end appends
    pub fn insert(&mut self, id: TrackId, at: usize) {
        let at = at.min(self.state.playlist.len());
        self.state.playlist.insert(id, at);
        self.edited = true;

        match self.play_index {
            QueuePosition::At(playing) if at <= playing => {
                self.play_index = QueuePosition::At(playing + 1);
            }
            position if at == position.following() => self.next_invalidated = true,
            _ => {}
        }
    }

    /// Exchange two entries
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        self.state.playlist.swap(a, b)?;
        self.edited = true;
        self.next_invalidated = true;

        if let QueuePosition::At(playing) = self.play_index {
            if a == playing {
                self.play_index = QueuePosition::At(b);
            } else if b == playing {
                self.play_index = QueuePosition::At(a);
            }
        }
        Ok(())
    }

    /// Move the entry at `from` so it ends up at `to`
    pub fn move_to(&mut self, from: usize, to: usize) -> Result<()> {
        self.state.playlist.move_to(from, to)?;
        self.edited = true;

        let QueuePosition::At(playing) = self.play_index else {
            self.next_invalidated = true;
            return Ok(());
        };

        let moved = if from == playing {
            to
        } else if from < playing && to >= playing {
            playing - 1
        } else if from > playing && to <= playing {
            playing + 1
        } else {
            playing
        };
        self.play_index = QueuePosition::At(moved);

        if from == playing || from == playing + 1 || to == moved + 1 {
            self.next_invalidated = true;
        }
        Ok(())
    }

    /// Remove the entry at `index`
    ///
    /// Removing the playing entry makes the next prefetch start over from
    /// the top of the playlist.
    pub fn delete(&mut self, index: usize) -> Result<TrackId> {
        let id = self.state.playlist.delete(index)?;
        self.edited = true;

        if self.state.playlist.is_empty() {
            self.play_index = QueuePosition::None;
            self.next_invalidated = true;
            return Ok(id);
        }

        if let QueuePosition::At(playing) = self.play_index {
            if index == playing {
                self.play_index = QueuePosition::StartOver;
            } else if index == playing + 1 {
                self.next_invalidated = true;
            } else if index < playing {
                self.play_index = QueuePosition::At(playing - 1);
            }
        }
        Ok(id)
    }

    /// Append `id`
    pub fn add(&mut self, id: TrackId) {
        self.state.playlist.add(id);
        self.edited = true;

        let tail = self.state.playlist.len() - 1;
        if tail == self.play_index.following() {
            self.next_invalidated = true;
        }
    }

    /// Empty the playlist and its unshuffled copy
    pub fn clear(&mut self) {
        self.state.playlist.clear();
        self.state.unshuffled.clear();
        self.play_index = QueuePosition::None;
        self.next_invalidated = true;
        self.edited = true;
    }

    /// Reshuffle the playlist, keeping the playing track
    pub fn shuffle(&mut self) {
        let state = &mut *self.state;
        state.index = self.play_index;

        if !state.unshuffled.is_empty() {
            self.service.toggle_shuffle_locked(state);
        }
        self.service.toggle_shuffle_locked(state);

        self.play_index = state.index;
        self.next_invalidated = true;
        self.edited = true;
    }
}

impl Drop for Editor<'_> {
    fn drop(&mut self) {
        if !self.edited {
            return;
        }

        if self.play_index != self.state.index || self.next_invalidated {
            let target = self.play_index.clamped(self.state.playlist.len());
            debug!("Playlist edited, playing position now {:?}", target);
            self.service.queue().post(Message::PrepareNextTrack {
                index: Some(target),
            });
        }

        self.service.queue().post(Message::NotifyEdited);
    }
}
