//! Backing-collection abstractions used by the copy-on-write wrappers.
//!
//! The wrappers only need a handful of primitive operations from the
//! collection they publish, so any map or set type can be used as a backing
//! store by implementing the matching trait. Implementations are provided for
//! the standard library collections.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use std::ops::Bound;

/// A map that can back a [`CowMap`](super::CowMap).
pub trait MapStore {
    /// The key type.
    type Key;
    /// The value type.
    type Value;

    /// Returns the value stored under `key`.
    fn lookup(&self, key: &Self::Key) -> Option<&Self::Value>;

    /// Stores `value` under `key`, returning the value it replaced.
    fn store_entry(&mut self, key: Self::Key, value: Self::Value) -> Option<Self::Value>;

    /// Removes the entry for `key`, returning its value.
    fn discard_entry(&mut self, key: &Self::Key) -> Option<Self::Value>;

    /// Returns the number of entries.
    fn entry_count(&self) -> usize;

    /// Removes every entry.
    fn clear_entries(&mut self);

    /// Keeps only the entries for which `keep` returns `true`.
    fn retain_entries(&mut self, keep: &mut dyn FnMut(&Self::Key, &Self::Value) -> bool);

    /// Iterates over the entries in the store's own order.
    fn iter_entries(&self) -> Box<dyn Iterator<Item = (&Self::Key, &Self::Value)> + '_>;
}

/// A map with ordered keys that can back the sorted operations of
/// [`CowMap`](super::CowMap).
pub trait SortedMapStore: MapStore {
    /// Iterates in key order over the entries whose keys lie within the bounds.
    ///
    /// Implementations must return an empty iterator, never panic, for
    /// bounds that describe an empty range.
    fn range_entries<'a>(
        &'a self,
        lower: Bound<&'a Self::Key>,
        upper: Bound<&'a Self::Key>,
    ) -> Box<dyn DoubleEndedIterator<Item = (&'a Self::Key, &'a Self::Value)> + 'a>;
}

/// A set that can back a [`CowSet`](super::CowSet).
pub trait SetStore {
    /// The element type.
    type Item;

    /// Returns whether `item` is present.
    fn contains_item(&self, item: &Self::Item) -> bool;

    /// Adds `item`, returning whether it was newly inserted.
    fn insert_item(&mut self, item: Self::Item) -> bool;

    /// Removes `item`, returning whether it was present.
    fn remove_item(&mut self, item: &Self::Item) -> bool;

    /// Returns the number of elements.
    fn item_count(&self) -> usize;

    /// Removes every element.
    fn clear_items(&mut self);

    /// Keeps only the elements for which `keep` returns `true`.
    fn retain_items(&mut self, keep: &mut dyn FnMut(&Self::Item) -> bool);

    /// Iterates over the elements in the store's own order.
    fn iter_items(&self) -> Box<dyn Iterator<Item = &Self::Item> + '_>;
}

impl<K, V, S> MapStore for HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Key = K;
    type Value = V;

    #[inline]
    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    #[inline]
    fn store_entry(&mut self, key: K, value: V) -> Option<V> {
        self.insert(key, value)
    }

    #[inline]
    fn discard_entry(&mut self, key: &K) -> Option<V> {
        self.remove(key)
    }

    #[inline]
    fn entry_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn clear_entries(&mut self) {
        self.clear();
    }

    fn retain_entries(&mut self, keep: &mut dyn FnMut(&K, &V) -> bool) {
        self.retain(|key, value| keep(key, value));
    }

    fn iter_entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }
}

impl<K: Ord, V> MapStore for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    #[inline]
    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    #[inline]
    fn store_entry(&mut self, key: K, value: V) -> Option<V> {
        self.insert(key, value)
    }

    #[inline]
    fn discard_entry(&mut self, key: &K) -> Option<V> {
        self.remove(key)
    }

    #[inline]
    fn entry_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn clear_entries(&mut self) {
        self.clear();
    }

    fn retain_entries(&mut self, keep: &mut dyn FnMut(&K, &V) -> bool) {
        self.retain(|key, value| keep(key, value));
    }

    fn iter_entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }
}

impl<K: Ord, V> SortedMapStore for BTreeMap<K, V> {
    fn range_entries<'a>(
        &'a self,
        lower: Bound<&'a K>,
        upper: Bound<&'a K>,
    ) -> Box<dyn DoubleEndedIterator<Item = (&'a K, &'a V)> + 'a> {
        if is_empty_range(lower, upper) {
            Box::new(std::iter::empty())
        } else {
            Box::new(self.range::<K, _>((lower, upper)))
        }
    }
}

/// Returns whether the bounds describe no keys at all.
///
/// `BTreeMap::range` panics on such bounds.
pub(crate) fn is_empty_range<K: Ord>(lower: Bound<&K>, upper: Bound<&K>) -> bool {
    match (lower, upper) {
        (Bound::Included(lower), Bound::Included(upper)) => lower > upper,
        (
            Bound::Included(lower) | Bound::Excluded(lower),
            Bound::Included(upper) | Bound::Excluded(upper),
        ) => lower >= upper,
        _ => false,
    }
}

impl<T, S> SetStore for HashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    type Item = T;

    #[inline]
    fn contains_item(&self, item: &T) -> bool {
        self.contains(item)
    }

    #[inline]
    fn insert_item(&mut self, item: T) -> bool {
        self.insert(item)
    }

    #[inline]
    fn remove_item(&mut self, item: &T) -> bool {
        self.remove(item)
    }

    #[inline]
    fn item_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn clear_items(&mut self) {
        self.clear();
    }

    fn retain_items(&mut self, keep: &mut dyn FnMut(&T) -> bool) {
        self.retain(|item| keep(item));
    }

    fn iter_items(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }
}

impl<T: Ord> SetStore for BTreeSet<T> {
    type Item = T;

    #[inline]
    fn contains_item(&self, item: &T) -> bool {
        self.contains(item)
    }

    #[inline]
    fn insert_item(&mut self, item: T) -> bool {
        self.insert(item)
    }

    #[inline]
    fn remove_item(&mut self, item: &T) -> bool {
        self.remove(item)
    }

    #[inline]
    fn item_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn clear_items(&mut self) {
        self.clear();
    }

    fn retain_items(&mut self, keep: &mut dyn FnMut(&T) -> bool) {
        self.retain(|item| keep(item));
    }

    fn iter_items(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Bound::Included(1), Bound::Included(1), false)]
    #[case(Bound::Included(1), Bound::Excluded(1), true)]
    #[case(Bound::Excluded(1), Bound::Excluded(1), true)]
    #[case(Bound::Excluded(1), Bound::Included(1), true)]
    #[case(Bound::Included(2), Bound::Included(1), true)]
    #[case(Bound::Included(1), Bound::Excluded(2), false)]
    #[case(Bound::Unbounded, Bound::Excluded(0), false)]
    fn test_is_empty_range(
        #[case] lower: Bound<i32>,
        #[case] upper: Bound<i32>,
        #[case] expected: bool,
    ) {
        assert_eq!(is_empty_range(lower.as_ref(), upper.as_ref()), expected);
    }

    #[rstest]
    fn test_btree_range_entries_never_panics_on_empty_bounds() {
        let map = BTreeMap::from([(1, "one"), (2, "two")]);
        let entries: Vec<_> = map
            .range_entries(Bound::Excluded(&1), Bound::Excluded(&1))
            .collect();
        assert!(entries.is_empty());
        let entries: Vec<_> = map
            .range_entries(Bound::Included(&1), Bound::Unbounded)
            .map(|(key, _)| *key)
            .collect();
        assert_eq!(entries, vec![1, 2]);
    }

    #[rstest]
    fn test_hash_map_store_operations() {
        let mut map: HashMap<&str, i32> = HashMap::new();
        assert_eq!(map.store_entry("a", 1), None);
        assert_eq!(map.store_entry("a", 2), Some(1));
        assert_eq!(map.lookup(&"a"), Some(&2));
        map.store_entry("b", 3);
        map.retain_entries(&mut |_, value| *value > 2);
        assert_eq!(map.entry_count(), 1);
        assert_eq!(map.discard_entry(&"b"), Some(3));
        assert_eq!(map.iter_entries().count(), 0);
    }

    #[rstest]
    fn test_set_store_operations() {
        let mut set = BTreeSet::new();
        assert!(set.insert_item(3));
        assert!(!set.insert_item(3));
        set.insert_item(4);
        set.retain_items(&mut |item| item % 2 == 0);
        assert!(!set.contains_item(&3));
        assert_eq!(set.iter_items().copied().collect::<Vec<_>>(), vec![4]);
        set.clear_items();
        assert_eq!(set.item_count(), 0);
    }
}
