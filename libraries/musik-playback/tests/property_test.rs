//! Property-based tests for playlist editing and shuffle
//!
//! Random edit sequences are replayed against a plain `Vec` model; after
//! every edit the service must agree with the model on the playlist and on
//! where the playing track sits.

mod common;

use common::Harness;
use musik_core::TrackId;
use proptest::prelude::*;

/// Tracks in the fixture library; new ids are drawn from above the initial list
const LIBRARY_SIZE: i64 = 200;

#[derive(Debug, Clone)]
enum Op {
    Insert(usize),
    Swap(usize, usize),
    Move(usize, usize),
    Delete(usize),
    Add,
    Clear,
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<usize>().prop_map(Op::Insert),
        4 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Swap(a, b)),
        4 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Move(a, b)),
        5 => any::<usize>().prop_map(Op::Delete),
        3 => Just(Op::Add),
        1 => Just(Op::Clear),
    ]
}

struct Model {
    ids: Vec<i64>,
    playing: Option<i64>,
    next_id: i64,
}

impl Model {
    fn fresh_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn playing_index(&self) -> Option<usize> {
        self.playing
            .and_then(|playing| self.ids.iter().position(|id| *id == playing))
    }
}

/// Apply `op` to both the service and the model
fn apply(h: &Harness, model: &mut Model, op: &Op) {
    let mut editor = h.service.edit();
    let len = model.ids.len();

    match *op {
        Op::Insert(seed) => {
            let at = seed % (len + 1);
            let id = model.fresh_id();
            editor.insert(TrackId::new(id), at);
            model.ids.insert(at, id);
        }
        Op::Swap(a, b) if len > 0 => {
            let (a, b) = (a % len, b % len);
            editor.swap(a, b).unwrap();
            model.ids.swap(a, b);
        }
        Op::Move(from, to) if len > 0 => {
            let (from, to) = (from % len, to % len);
            if from != to {
                editor.move_to(from, to).unwrap();
                let id = model.ids.remove(from);
                model.ids.insert(to, id);
            }
        }
        Op::Delete(index) if len > 0 => {
            let index = index % len;
            let removed = editor.delete(index).unwrap();
            assert_eq!(removed.get(), model.ids.remove(index));
            if model.playing == Some(removed.get()) {
                model.playing = None;
            }
        }
        Op::Add => {
            let id = model.fresh_id();
            editor.add(TrackId::new(id));
            model.ids.push(id);
        }
        Op::Clear => {
            editor.clear();
            model.ids.clear();
            model.playing = None;
        }
        Op::Swap(..) | Op::Move(..) | Op::Delete(_) => {}
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the playing index always follows the playing track, and the
    /// prefetch index is always the slot right after it
    #[test]
    fn edits_track_the_playing_item(
        count in 1usize..30,
        start in any::<usize>(),
        ops in prop::collection::vec(arbitrary_op(), 1..40),
    ) {
        let h = Harness::new(LIBRARY_SIZE);
        let initial: Vec<i64> = (1..=count as i64).collect();
        let start = start % count;
        h.play(&initial, start);

        let mut model = Model {
            playing: Some(initial[start]),
            ids: initial,
            next_id: count as i64 + 1,
        };

        for op in &ops {
            apply(&h, &mut model, op);
            h.settle();

            let playlist: Vec<i64> = h.playlist().iter().map(|id| id.get()).collect();
            prop_assert_eq!(&playlist, &model.ids, "after {:?}", op);
            prop_assert_eq!(h.service.index(), model.playing_index(), "after {:?}", op);

            let count = model.ids.len();
            let next = h.service.next_index();
            prop_assert!(next.map_or(true, |next| next < count), "stale prefetch {:?}", next);
            if let Some(index) = h.service.index() {
                let expected = (index + 1 < count).then_some(index + 1);
                prop_assert_eq!(next, expected, "after {:?}", op);
            }
        }

        // The playing stream itself is never interrupted by edits
        prop_assert!(h.is_playing());
    }

    /// Property: shuffling twice restores the original order and index
    #[test]
    fn shuffle_round_trip_restores_order(count in 1usize..40, start in any::<usize>()) {
        let h = Harness::new(count as i64);
        let order: Vec<i64> = (1..=count as i64).collect();
        let start = start % count;
        h.play(&order, start);
        let before = h.playlist();

        h.service.toggle_shuffle();
        h.settle();
        let index = h.service.index().unwrap();
        prop_assert_eq!(h.playlist()[index].get(), order[start]);

        let mut sorted = h.playlist();
        sorted.sort();
        prop_assert_eq!(&sorted, &before);

        h.service.toggle_shuffle();
        h.settle();
        prop_assert_eq!(h.playlist(), before);
        prop_assert_eq!(h.service.index(), Some(start));
    }
}
