//! ID types for library entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Track identifier
///
/// Library row id. Playlists are sequences of these; the same id may appear
/// more than once in a single playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(i64);

impl TrackId {
    /// Create a new track ID
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
