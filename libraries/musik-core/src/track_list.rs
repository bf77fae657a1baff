//! Ordered, id-addressable track sequence
//!
//! A `TrackList` only stores ids. Full records are materialized lazily through
//! the `Library` and memoized in a small LRU cache, so a playlist of tens of
//! thousands of entries stays cheap to copy, shuffle and edit.

use crate::error::{CoreError, Result};
use crate::library::Library;
use crate::types::{TrackId, TrackPtr};
use lru::LruCache;
use rand::seq::SliceRandom;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// Number of materialized tracks kept per list
const DEFAULT_CACHE_SIZE: usize = 50;

/// Playlist storage
pub struct TrackList {
    ids: Vec<TrackId>,
    library: Arc<dyn Library>,
    cache: LruCache<TrackId, TrackPtr>,
}

impl TrackList {
    /// Create an empty list backed by `library`
    pub fn new(library: Arc<dyn Library>) -> Self {
        Self::with_ids(library, Vec::new())
    }

    /// Create a list from ids
    pub fn with_ids(library: Arc<dyn Library>, ids: Vec<TrackId>) -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            ids,
            library,
            cache: LruCache::new(capacity),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the list has no entries
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Id at `index`
    pub fn id_at(&self, index: usize) -> Option<TrackId> {
        self.ids.get(index).copied()
    }

    /// First index holding `id`
    pub fn index_of(&self, id: TrackId) -> Option<usize> {
        self.ids.iter().position(|candidate| *candidate == id)
    }

    /// All ids in order
    pub fn ids(&self) -> &[TrackId] {
        &self.ids
    }

    /// Library this list materializes through
    pub fn library(&self) -> &Arc<dyn Library> {
        &self.library
    }

    /// Materialize the track at `index`, waiting at most `timeout`
    ///
    /// Cached records are returned without touching the library.
    pub fn get_with_timeout(&mut self, index: usize, timeout: Duration) -> Result<TrackPtr> {
        let id = self
            .id_at(index)
            .ok_or_else(|| CoreError::out_of_bounds(index, self.ids.len()))?;

        if let Some(track) = self.cache.get(&id) {
            return Ok(Arc::clone(track));
        }

        let track = self.library.track(id, timeout)?;
        self.cache.put(id, Arc::clone(&track));
        Ok(track)
    }

    /// Append an id
    pub fn add(&mut self, id: TrackId) {
        self.ids.push(id);
    }

    /// Insert `id` before `index`; indices at or past the end append
    pub fn insert(&mut self, id: TrackId, index: usize) {
        if index < self.ids.len() {
            self.ids.insert(index, id);
        } else {
            self.ids.push(id);
        }
    }

    /// Exchange two entries
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        let len = self.ids.len();
        for index in [a, b] {
            if index >= len {
                return Err(CoreError::out_of_bounds(index, len));
            }
        }
        self.ids.swap(a, b);
        Ok(())
    }

    /// Move the entry at `from` so that it ends up at `to`
    pub fn move_to(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.ids.len();
        if from >= len {
            return Err(CoreError::out_of_bounds(from, len));
        }
        if to >= len {
            return Err(CoreError::out_of_bounds(to, len));
        }
        if from == to {
            return Err(CoreError::other("move source and destination are equal"));
        }
        let id = self.ids.remove(from);
        self.ids.insert(to, id);
        Ok(())
    }

    /// Remove the entry at `index`
    pub fn delete(&mut self, index: usize) -> Result<TrackId> {
        let len = self.ids.len();
        if index >= len {
            return Err(CoreError::out_of_bounds(index, len));
        }
        Ok(self.ids.remove(index))
    }

    /// Remove all entries and cached records
    pub fn clear(&mut self) {
        self.clear_cache();
        self.ids.clear();
    }

    /// Forget memoized records (library contents changed underneath us)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Replace contents with a copy of `other`'s ids
    pub fn copy_from(&mut self, other: &TrackList) {
        self.clear();
        self.ids.extend_from_slice(&other.ids);
    }

    /// Replace contents with `ids`
    pub fn set_ids(&mut self, ids: Vec<TrackId>) {
        self.clear();
        self.ids = ids;
    }

    /// Exchange id sequences with `other`
    ///
    /// Caches are dropped on both sides since they no longer describe the
    /// same window of ids.
    pub fn swap_contents(&mut self, other: &mut TrackList) {
        std::mem::swap(&mut self.ids, &mut other.ids);
        self.clear_cache();
        other.clear_cache();
    }

    /// Randomize order in place (Fisher-Yates)
    pub fn shuffle(&mut self) {
        self.ids.shuffle(&mut rand::thread_rng());
    }
}

impl Clone for TrackList {
    fn clone(&self) -> Self {
        Self::with_ids(Arc::clone(&self.library), self.ids.clone())
    }
}

impl fmt::Debug for TrackList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackList")
            .field("ids", &self.ids)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::InMemoryLibrary;
    use crate::types::Track;

    fn ids(values: &[i64]) -> Vec<TrackId> {
        values.iter().copied().map(TrackId::new).collect()
    }

    fn list(values: &[i64]) -> (Arc<InMemoryLibrary>, TrackList) {
        let library = Arc::new(InMemoryLibrary::with_tracks(
            values.iter().map(|i| Track::new(*i, format!("/music/{i}.mp3"), "t")),
        ));
        let list = TrackList::with_ids(library.clone(), ids(values));
        (library, list)
    }

    #[test]
    fn insert_past_end_appends() {
        let (_, mut list) = list(&[1, 2, 3]);
        list.insert(TrackId::new(9), 1);
        list.insert(TrackId::new(8), 100);
        assert_eq!(list.ids(), ids(&[1, 9, 2, 3, 8]).as_slice());
    }

    #[test]
    fn move_to_shifts_neighbours() {
        let (_, mut list) = list(&[1, 2, 3, 4]);
        list.move_to(0, 2).unwrap();
        assert_eq!(list.ids(), ids(&[2, 3, 1, 4]).as_slice());
        list.move_to(3, 0).unwrap();
        assert_eq!(list.ids(), ids(&[4, 2, 3, 1]).as_slice());
        assert!(list.move_to(1, 1).is_err());
        assert!(list.move_to(0, 4).is_err());
    }

    #[test]
    fn swap_and_delete_bounds() {
        let (_, mut list) = list(&[1, 2, 3]);
        list.swap(0, 2).unwrap();
        assert_eq!(list.ids(), ids(&[3, 2, 1]).as_slice());
        assert!(matches!(
            list.swap(0, 3),
            Err(CoreError::IndexOutOfBounds { index: 3, len: 3 })
        ));
        assert_eq!(list.delete(1).unwrap(), TrackId::new(2));
        assert!(list.delete(2).is_err());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn get_with_timeout_memoizes() {
        let (library, mut list) = list(&[1, 2]);
        let first = list.get_with_timeout(1, Duration::from_millis(10)).unwrap();

        // A cached record survives the library forgetting it
        library.remove(TrackId::new(2));
        let again = list.get_with_timeout(1, Duration::from_millis(10)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        list.clear_cache();
        assert!(list.get_with_timeout(1, Duration::from_millis(10)).is_err());
        assert!(matches!(
            list.get_with_timeout(5, Duration::from_millis(10)),
            Err(CoreError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn swap_contents_exchanges_ids() {
        let (library, mut a) = list(&[1, 2, 3]);
        let mut b = TrackList::with_ids(library, ids(&[7]));
        a.swap_contents(&mut b);
        assert_eq!(a.ids(), ids(&[7]).as_slice());
        assert_eq!(b.ids(), ids(&[1, 2, 3]).as_slice());
    }

    #[test]
    fn shuffle_keeps_the_same_multiset() {
        let (_, mut list) = list(&[1, 2, 3, 4, 5, 6, 7, 8]);
        list.add(TrackId::new(1));
        list.shuffle();
        let mut sorted = list.ids().to_vec();
        sorted.sort();
        assert_eq!(sorted, ids(&[1, 1, 2, 3, 4, 5, 6, 7, 8]));
    }

    #[test]
    fn clone_is_detached() {
        let (_, list) = list(&[1, 2, 3]);
        let mut copy = list.clone();
        copy.delete(0).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(copy.len(), 2);
        assert_eq!(list.index_of(TrackId::new(3)), Some(2));
        assert_eq!(copy.index_of(TrackId::new(3)), Some(1));
    }
}
