#![cfg(feature = "cow")]

use rstest::{fixture, rstest};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::ops::Bound;
use synchrony::cow::{CowError, CowSortedMap, KeyRange};

#[fixture]
fn numbered() -> CowSortedMap<String, u32> {
    (1..=4).map(|number| (number.to_string(), number)).collect()
}

fn key(text: &str) -> String {
    text.to_string()
}

// =============================================================================
// Sub-map Views
// =============================================================================

#[rstest]
fn sorted_sub_map_holds_half_open_range(numbered: CowSortedMap<String, u32>) {
    let middle = numbered.sub_map(key("2"), key("4")).unwrap();
    assert_eq!(middle, BTreeMap::from([(key("2"), 2), (key("3"), 3)]));
    assert_eq!(middle.len(), 2);
    assert_eq!(middle.first_key(), Some(key("2")));
    assert_eq!(middle.last_key(), Some(key("3")));
    assert!(!middle.contains_key(&key("4")));
}

#[rstest]
fn sorted_sub_map_rejects_out_of_range_put(numbered: CowSortedMap<String, u32>) {
    let middle = numbered.sub_map(key("2"), key("4")).unwrap();
    let version = numbered.version();

    let error = middle.put(key("5"), 5).unwrap_err();
    assert_eq!(error, CowError::KeyOutOfRange);
    assert!(error.is_invalid_argument());
    assert_eq!(middle.put(key("4"), 4), Err(CowError::KeyOutOfRange));
    assert_eq!(numbered.version(), version);
    assert_eq!(numbered.len(), 4);
}

#[rstest]
fn sorted_sub_map_writes_reach_the_whole_map(numbered: CowSortedMap<String, u32>) {
    let middle = numbered.sub_map(key("2"), key("4")).unwrap();
    assert_eq!(middle.put(key("25"), 25), Ok(None));
    assert_eq!(numbered.get(&key("25")), Some(25));

    assert_eq!(middle.remove(&key("1")), None);
    assert!(numbered.contains_key(&key("1")));

    middle.clear();
    assert!(middle.is_empty());
    assert_eq!(numbered.keys().iter().collect::<Vec<_>>(), vec![key("1"), key("4")]);
}

#[rstest]
fn sorted_sub_map_sees_later_writes(numbered: CowSortedMap<String, u32>) {
    let tail = numbered.tail_map(key("3"));
    assert_eq!(tail.keys().collect::<Vec<_>>(), vec![key("3"), key("4")]);

    numbered.put(key("9"), 9);
    numbered.remove(&key("3"));
    assert_eq!(tail.keys().collect::<Vec<_>>(), vec![key("4"), key("9")]);
}

#[rstest]
fn sorted_head_and_tail_split_the_map(numbered: CowSortedMap<String, u32>) {
    let head = numbered.head_map(key("3"));
    let tail = numbered.tail_map(key("3"));
    assert_eq!(head.values().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(tail.values().collect::<Vec<_>>(), vec![3, 4]);
    assert_eq!(head.len() + tail.len(), numbered.len());
}

#[rstest]
#[case::inverted_sub_map("3", "2", CowError::InvalidRange)]
#[case::lower_outside("1", "3", CowError::KeyOutOfRange)]
#[case::upper_outside("2", "5", CowError::KeyOutOfRange)]
fn sorted_nested_sub_map_errors(
    numbered: CowSortedMap<String, u32>,
    #[case] from: &str,
    #[case] to: &str,
    #[case] expected: CowError,
) {
    let middle = numbered.sub_map(key("2"), key("4")).unwrap();
    assert_eq!(middle.sub_map(key(from), key(to)).err(), Some(expected));
}

#[rstest]
fn sorted_nested_sub_map_accepts_range_edge(numbered: CowSortedMap<String, u32>) {
    let middle = numbered.sub_map(key("2"), key("4")).unwrap();
    // The exclusive upper bound of the outer view is a valid exclusive bound.
    let nested = middle.head_map(key("4")).unwrap();
    assert_eq!(nested, middle.clone());
    assert_eq!(middle.tail_map(key("4")).err(), Some(CowError::KeyOutOfRange));
    assert_eq!(nested.range().lower(), Bound::Included(&key("2")));
}

#[rstest]
fn sorted_top_level_sub_map_rejects_inverted_range(numbered: CowSortedMap<String, u32>) {
    assert_eq!(numbered.sub_map(key("4"), key("2")).err(), Some(CowError::InvalidRange));
    assert!(numbered.sub_map(key("2"), key("2")).unwrap().is_empty());
}

// =============================================================================
// Ordering
// =============================================================================

#[rstest]
fn sorted_first_and_last(numbered: CowSortedMap<String, u32>) {
    assert_eq!(numbered.first_entry(), Some((key("1"), 1)));
    assert_eq!(numbered.last_entry(), Some((key("4"), 4)));

    let empty: CowSortedMap<u8, u8> = CowSortedMap::default();
    assert_eq!(empty.first_key(), None);
    assert_eq!(empty.last_entry(), None);
}

#[rstest]
fn sorted_reverse_ordering_through_key_wrapper() {
    let map: CowSortedMap<Reverse<u32>, &str> =
        [(Reverse(1), "one"), (Reverse(2), "two"), (Reverse(3), "three")]
            .into_iter()
            .collect();
    assert_eq!(map.first_key(), Some(Reverse(3)));
    let below_two = map.tail_map(Reverse(2));
    assert_eq!(below_two.values().collect::<Vec<_>>(), vec!["two", "one"]);
}

#[rstest]
fn sorted_range_map_with_explicit_bounds(numbered: CowSortedMap<String, u32>) {
    let view = numbered
        .range_map(Bound::Excluded(key("1")), Bound::Included(key("3")))
        .unwrap();
    assert_eq!(view.keys().collect::<Vec<_>>(), vec![key("2"), key("3")]);
    assert!(view.range().contains(&key("3")));
    assert_eq!(
        view.range(),
        &KeyRange::new(Bound::Excluded(key("1")), Bound::Included(key("3"))).unwrap()
    );
}
