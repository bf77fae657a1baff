//! Property-based tests for `TrackList` editing
//!
//! Every mutation is mirrored on a plain `Vec` and the two must agree.

use musik_core::{InMemoryLibrary, Library, TrackId, TrackList};
use proptest::prelude::*;
use std::sync::Arc;

fn list(ids: &[i64]) -> TrackList {
    let library: Arc<dyn Library> = Arc::new(InMemoryLibrary::new());
    TrackList::with_ids(library, ids.iter().copied().map(TrackId::new).collect())
}

fn raw(list: &TrackList) -> Vec<i64> {
    list.ids().iter().map(|id| id.get()).collect()
}

proptest! {
    /// Property: move_to lands the entry at `to` and keeps the rest in order
    #[test]
    fn move_matches_remove_then_insert(
        ids in prop::collection::vec(0i64..50, 2..30),
        from in any::<usize>(),
        to in any::<usize>(),
    ) {
        let from = from % ids.len();
        let to = to % ids.len();
        prop_assume!(from != to);

        let mut tracks = list(&ids);
        tracks.move_to(from, to).unwrap();

        let mut expected = ids.clone();
        let moved = expected.remove(from);
        expected.insert(to, moved);

        prop_assert_eq!(raw(&tracks), expected);
        prop_assert_eq!(tracks.id_at(to), Some(TrackId::new(ids[from])));
    }

    /// Property: inserting then deleting at the same slot is a no-op
    #[test]
    fn insert_then_delete_restores(
        ids in prop::collection::vec(0i64..50, 0..30),
        at in any::<usize>(),
    ) {
        let at = at % (ids.len() + 1);
        let mut tracks = list(&ids);

        tracks.insert(TrackId::new(99), at);
        prop_assert_eq!(tracks.len(), ids.len() + 1);
        prop_assert_eq!(tracks.delete(at).unwrap(), TrackId::new(99));
        prop_assert_eq!(raw(&tracks), ids);
    }

    /// Property: shuffle keeps every id exactly as often as before
    #[test]
    fn shuffle_is_a_permutation(ids in prop::collection::vec(0i64..20, 0..60)) {
        let mut tracks = list(&ids);
        tracks.shuffle();

        let mut shuffled = raw(&tracks);
        let mut original = ids;
        shuffled.sort_unstable();
        original.sort_unstable();
        prop_assert_eq!(shuffled, original);
    }

    /// Property: out-of-range edits fail and leave the list untouched
    #[test]
    fn out_of_range_edits_fail(
        ids in prop::collection::vec(0i64..50, 0..10),
        past in 0usize..5,
    ) {
        let mut tracks = list(&ids);
        let index = ids.len() + past;

        prop_assert!(tracks.delete(index).is_err());
        prop_assert!(tracks.swap(0, index).is_err());
        prop_assert!(tracks.move_to(index, 0).is_err());
        prop_assert_eq!(raw(&tracks), ids);
    }
}
