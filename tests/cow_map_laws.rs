#![cfg(feature = "cow")]
//! Property-based tests for the copy-on-write collections.
//!
//! Every operation sequence applied to a `CowMap` must leave it equal to the
//! same sequence applied to a plain map, and earlier snapshots must never
//! change.

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use synchrony::cow::{CowMap, CowSet, CowSortedMap};

#[derive(Debug, Clone)]
enum MapOperation {
    Put(u8, i32),
    Remove(u8),
    PutAll(Vec<(u8, i32)>),
    RetainEven,
    Clear,
}

fn map_operation() -> impl Strategy<Value = MapOperation> {
    prop_oneof![
        4 => (any::<u8>(), any::<i32>()).prop_map(|(key, value)| MapOperation::Put(key, value)),
        3 => any::<u8>().prop_map(MapOperation::Remove),
        1 => prop::collection::vec((any::<u8>(), any::<i32>()), 0..8).prop_map(MapOperation::PutAll),
        1 => Just(MapOperation::RetainEven),
        1 => Just(MapOperation::Clear),
    ]
}

fn apply(map: &CowSortedMap<u8, i32>, model: &mut BTreeMap<u8, i32>, operation: MapOperation) {
    match operation {
        MapOperation::Put(key, value) => {
            assert_eq!(map.put(key, value), model.insert(key, value));
        }
        MapOperation::Remove(key) => {
            assert_eq!(map.remove(&key), model.remove(&key));
        }
        MapOperation::PutAll(entries) => {
            model.extend(entries.iter().copied());
            map.put_all(entries);
        }
        MapOperation::RetainEven => {
            let before = model.len();
            model.retain(|_, value| *value % 2 == 0);
            assert_eq!(map.retain(|_, value| *value % 2 == 0), model.len() != before);
        }
        MapOperation::Clear => {
            model.clear();
            map.clear();
        }
    }
}

// =============================================================================
// Model Equivalence
// =============================================================================

proptest! {
    /// A map behaves exactly like the plain map it wraps.
    #[test]
    fn prop_cow_map_matches_model(operations in prop::collection::vec(map_operation(), 0..40)) {
        let map: CowSortedMap<u8, i32> = CowMap::default();
        let mut model = BTreeMap::new();
        let operation_count = operations.len() as u64;

        for operation in operations {
            apply(&map, &mut model, operation);
            prop_assert_eq!(&map, &model);
        }
        prop_assert_eq!(map.version(), operation_count);
        prop_assert_eq!(map.iter().collect::<BTreeMap<_, _>>(), model);
    }

    /// Snapshots taken before a write keep their contents forever.
    #[test]
    fn prop_cow_map_snapshots_are_immutable(
        operations in prop::collection::vec(map_operation(), 1..20)
    ) {
        let map: CowSortedMap<u8, i32> = CowMap::default();
        let mut model = BTreeMap::new();
        let mut history = Vec::new();

        for operation in operations {
            history.push((map.snapshot(), model.clone()));
            apply(&map, &mut model, operation);
        }
        for (snapshot, expected) in history {
            prop_assert_eq!(&*snapshot, &expected);
        }
    }

    /// Iterators are unaffected by writes made after they were created.
    #[test]
    fn prop_cow_map_iterator_is_isolated(
        entries in prop::collection::btree_map(any::<u8>(), any::<i32>(), 0..20),
        operation in map_operation()
    ) {
        let map = CowMap::new(entries.clone());
        let iterator = map.iter();
        let mut model = entries.clone();
        apply(&map, &mut model, operation);
        prop_assert_eq!(iterator.collect::<BTreeMap<_, _>>(), entries);
    }
}

// =============================================================================
// Sub-map Laws
// =============================================================================

proptest! {
    /// A sub-map holds exactly the entries of the map within its range.
    #[test]
    fn prop_sub_map_filters_by_range(
        entries in prop::collection::btree_map(any::<u8>(), any::<i32>(), 0..30),
        from: u8,
        to: u8
    ) {
        prop_assume!(from <= to);
        let map = CowMap::new(entries.clone());
        let view = map.sub_map(from, to).unwrap();
        let expected: BTreeMap<u8, i32> = entries.range(from..to).map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(&view, &expected);
        prop_assert_eq!(view.len(), expected.len());
    }

    /// A put through a sub-map succeeds exactly when the key is in range.
    #[test]
    fn prop_sub_map_put_respects_range(from: u8, to: u8, key: u8, value: i32) {
        prop_assume!(from <= to);
        let map: CowSortedMap<u8, i32> = CowMap::default();
        let view = map.range_map(Bound::Included(from), Bound::Excluded(to)).unwrap();
        let in_range = from <= key && key < to;

        prop_assert_eq!(view.put(key, value).is_ok(), in_range);
        prop_assert_eq!(map.get(&key), in_range.then_some(value));
    }

    /// Inverted bounds are always rejected.
    #[test]
    fn prop_sub_map_rejects_inverted_bounds(from: u8, to: u8) {
        prop_assume!(from > to);
        let map: CowSortedMap<u8, i32> = CowMap::default();
        prop_assert!(map.sub_map(from, to).is_err());
    }
}

// =============================================================================
// Set Laws
// =============================================================================

proptest! {
    /// A set behaves exactly like the plain set it wraps.
    #[test]
    fn prop_cow_set_matches_model(
        inserts in prop::collection::vec(any::<u8>(), 0..30),
        removes in prop::collection::vec(any::<u8>(), 0..30)
    ) {
        let set: CowSet<BTreeSet<u8>> = CowSet::default();
        let mut model = BTreeSet::new();

        for item in &inserts {
            prop_assert_eq!(set.insert(*item), model.insert(*item));
        }
        for item in &removes {
            prop_assert_eq!(set.remove(item), model.remove(item));
        }
        prop_assert_eq!(&set, &model);
        prop_assert_eq!(set.iter().collect::<BTreeSet<_>>(), model);
    }
}
