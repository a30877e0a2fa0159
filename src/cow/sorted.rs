//! Ordered operations and range-scoped views for copy-on-write maps with
//! sorted keys.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use super::map::{Cursor, SnapshotIter, project_entry};
use super::store::is_empty_range;
use super::{CowError, CowMap, SortedMapStore};

/// A copy-on-write map backed by a [`BTreeMap`].
///
/// Keys are kept in the order of their [`Ord`] implementation in every
/// snapshot and every sub-map view. Wrap keys in [`std::cmp::Reverse`] or a
/// newtype to use a different order.
///
/// # Examples
///
/// ```rust
/// use synchrony::cow::CowSortedMap;
/// use std::collections::BTreeMap;
///
/// let map: CowSortedMap<u32, &str> =
///     CowSortedMap::new(BTreeMap::from([(1, "a"), (2, "b"), (3, "c"), (4, "d")]));
///
/// let middle = map.sub_map(2, 4).unwrap();
/// assert_eq!(middle.keys().collect::<Vec<_>>(), vec![2, 3]);
/// assert!(middle.put(9, "z").is_err());
///
/// assert_eq!(map.first_key(), Some(1));
/// assert_eq!(map.last_key(), Some(4));
/// ```
pub type CowSortedMap<K, V> = CowMap<BTreeMap<K, V>>;

// =============================================================================
// KeyRange
// =============================================================================

/// A contiguous range of keys, described by a lower and an upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRange<K> {
    lower: Bound<K>,
    upper: Bound<K>,
}

impl<K: Ord> KeyRange<K> {
    /// The range holding every key.
    pub const fn full() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// Creates a range from its bounds.
    ///
    /// Equal bounds are accepted even when one of them is exclusive; the
    /// range is then empty.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::InvalidRange`] if the lower bound's key is greater
    /// than the upper bound's key.
    pub fn new(lower: Bound<K>, upper: Bound<K>) -> Result<Self, CowError> {
        if let (
            Bound::Included(low) | Bound::Excluded(low),
            Bound::Included(high) | Bound::Excluded(high),
        ) = (&lower, &upper)
            && low > high
        {
            return Err(CowError::InvalidRange);
        }
        Ok(Self { lower, upper })
    }

    /// Returns the lower bound.
    pub fn lower(&self) -> Bound<&K> {
        self.lower.as_ref()
    }

    /// Returns the upper bound.
    pub fn upper(&self) -> Bound<&K> {
        self.upper.as_ref()
    }

    /// Returns whether `key` lies within the range.
    pub fn contains(&self, key: &K) -> bool {
        let above_lower = match &self.lower {
            Bound::Included(low) => key >= low,
            Bound::Excluded(low) => key > low,
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Included(high) => key <= high,
            Bound::Excluded(high) => key < high,
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }

    /// Returns whether no key can lie within the range.
    pub fn is_empty(&self) -> bool {
        is_empty_range(self.lower(), self.upper())
    }

    // Same as `contains`, but treats both bounds as inclusive.
    fn contains_closed(&self, key: &K) -> bool {
        let above_lower = match &self.lower {
            Bound::Included(low) | Bound::Excluded(low) => key >= low,
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Included(high) | Bound::Excluded(high) => key <= high,
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }

    fn admits(&self, bound: Bound<&K>) -> bool {
        match bound {
            Bound::Included(key) => self.contains(key),
            Bound::Excluded(key) => self.contains_closed(key),
            Bound::Unbounded => true,
        }
    }

    /// Restricts this range to the given bounds.
    ///
    /// An unbounded side keeps this range's bound on that side.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::InvalidRange`] if the bounds are inverted, and
    /// [`CowError::KeyOutOfRange`] if either bound reaches outside this range.
    pub fn narrow(&self, lower: Bound<K>, upper: Bound<K>) -> Result<Self, CowError>
    where
        K: Clone,
    {
        let requested = Self::new(lower, upper)?;
        if !self.admits(requested.lower()) || !self.admits(requested.upper()) {
            return Err(CowError::KeyOutOfRange);
        }
        let Self {
            lower: requested_lower,
            upper: requested_upper,
        } = requested;
        Ok(Self {
            lower: match requested_lower {
                Bound::Unbounded => self.lower.clone(),
                bound => bound,
            },
            upper: match requested_upper {
                Bound::Unbounded => self.upper.clone(),
                bound => bound,
            },
        })
    }
}

impl<K: Ord> Default for KeyRange<K> {
    fn default() -> Self {
        Self::full()
    }
}

// =============================================================================
// Ordered operations on CowMap
// =============================================================================

impl<M> CowMap<M>
where
    M: SortedMapStore,
    M::Key: Ord + Clone,
{
    /// Returns the smallest key.
    pub fn first_key(&self) -> Option<M::Key> {
        self.read(|map| {
            map.range_entries(Bound::Unbounded, Bound::Unbounded)
                .next()
                .map(|(key, _)| key.clone())
        })
    }

    /// Returns the largest key.
    pub fn last_key(&self) -> Option<M::Key> {
        self.read(|map| {
            map.range_entries(Bound::Unbounded, Bound::Unbounded)
                .next_back()
                .map(|(key, _)| key.clone())
        })
    }

    /// Returns the entry with the smallest key.
    pub fn first_entry(&self) -> Option<(M::Key, M::Value)>
    where
        M::Value: Clone,
    {
        self.read(|map| {
            map.range_entries(Bound::Unbounded, Bound::Unbounded)
                .next()
                .map(|(key, value)| (key.clone(), value.clone()))
        })
    }

    /// Returns the entry with the largest key.
    pub fn last_entry(&self) -> Option<(M::Key, M::Value)>
    where
        M::Value: Clone,
    {
        self.read(|map| {
            map.range_entries(Bound::Unbounded, Bound::Unbounded)
                .next_back()
                .map(|(key, value)| (key.clone(), value.clone()))
        })
    }

    /// Returns a view of the entries whose keys are strictly less than `to`.
    pub fn head_map(&self, to: M::Key) -> SubMap<'_, M> {
        SubMap::new(
            self,
            KeyRange {
                lower: Bound::Unbounded,
                upper: Bound::Excluded(to),
            },
        )
    }

    /// Returns a view of the entries whose keys are greater than or equal to
    /// `from`.
    pub fn tail_map(&self, from: M::Key) -> SubMap<'_, M> {
        SubMap::new(
            self,
            KeyRange {
                lower: Bound::Included(from),
                upper: Bound::Unbounded,
            },
        )
    }

    /// Returns a view of the entries with keys in `from..to`.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::InvalidRange`] if `from` is greater than `to`.
    pub fn sub_map(&self, from: M::Key, to: M::Key) -> Result<SubMap<'_, M>, CowError> {
        self.range_map(Bound::Included(from), Bound::Excluded(to))
    }

    /// Returns a view of the entries with keys between arbitrary bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::InvalidRange`] if the bounds are inverted.
    pub fn range_map(
        &self,
        lower: Bound<M::Key>,
        upper: Bound<M::Key>,
    ) -> Result<SubMap<'_, M>, CowError> {
        Ok(SubMap::new(self, KeyRange::new(lower, upper)?))
    }
}

// =============================================================================
// SubMap
// =============================================================================

/// A live view of the entries of a sorted [`CowMap`] whose keys lie within a
/// [`KeyRange`].
///
/// Every read goes to the map's currently published snapshot. Writes go
/// through the map's copy-on-write protocol and are confined to the range:
/// storing a key outside it fails with [`CowError::KeyOutOfRange`], and
/// removals never touch entries outside it.
pub struct SubMap<'a, M: SortedMapStore> {
    map: &'a CowMap<M>,
    range: KeyRange<M::Key>,
}

impl<'a, M> SubMap<'a, M>
where
    M: SortedMapStore,
    M::Key: Ord + Clone,
{
    const fn new(map: &'a CowMap<M>, range: KeyRange<M::Key>) -> Self {
        Self { map, range }
    }

    /// Returns the key range of this view.
    pub const fn range(&self) -> &KeyRange<M::Key> {
        &self.range
    }

    fn read<R>(
        &self,
        reader: impl FnOnce(&mut dyn DoubleEndedIterator<Item = (&M::Key, &M::Value)>) -> R,
    ) -> R {
        self.map.read(|map| {
            let mut entries = map.range_entries(self.range.lower(), self.range.upper());
            reader(&mut entries)
        })
    }

    /// Returns a clone of the value stored under `key`, if `key` is in range.
    pub fn get(&self, key: &M::Key) -> Option<M::Value>
    where
        M::Value: Clone,
    {
        if self.range.contains(key) {
            self.map.get(key)
        } else {
            None
        }
    }

    /// Returns whether an entry exists for `key` within the range.
    pub fn contains_key(&self, key: &M::Key) -> bool {
        self.range.contains(key) && self.map.contains_key(key)
    }

    /// Returns the number of entries within the range.
    pub fn len(&self) -> usize {
        self.read(|entries| entries.count())
    }

    /// Returns `true` if no entry lies within the range.
    pub fn is_empty(&self) -> bool {
        self.read(|entries| entries.next().is_none())
    }

    /// Returns the smallest key within the range.
    pub fn first_key(&self) -> Option<M::Key> {
        self.read(|entries| entries.next().map(|(key, _)| key.clone()))
    }

    /// Returns the largest key within the range.
    pub fn last_key(&self) -> Option<M::Key> {
        self.read(|entries| entries.next_back().map(|(key, _)| key.clone()))
    }

    /// Iterates over a snapshot of the entries within the range, in key order.
    pub fn iter(&self) -> SnapshotIter<(M::Key, M::Value)>
    where
        M::Value: Clone,
    {
        SnapshotIter::new(self.read(|entries| {
            entries
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        }))
    }

    /// Iterates over a snapshot of the keys within the range, in order.
    pub fn keys(&self) -> SnapshotIter<M::Key> {
        SnapshotIter::new(self.read(|entries| entries.map(|(key, _)| key.clone()).collect()))
    }

    /// Iterates over a snapshot of the values within the range, in key order.
    pub fn values(&self) -> SnapshotIter<M::Value>
    where
        M::Value: Clone,
    {
        SnapshotIter::new(self.read(|entries| entries.map(|(_, value)| value.clone()).collect()))
    }

    /// Stores `value` under `key` in the underlying map.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::KeyOutOfRange`] if `key` lies outside the range;
    /// the map is then left untouched.
    pub fn put(&self, key: M::Key, value: M::Value) -> Result<Option<M::Value>, CowError> {
        if !self.range.contains(&key) {
            return Err(CowError::KeyOutOfRange);
        }
        Ok(self.map.put(key, value))
    }

    /// Removes the entry for `key` if it lies within the range.
    ///
    /// Keys outside the range are ignored without writing to the map.
    pub fn remove(&self, key: &M::Key) -> Option<M::Value> {
        if self.range.contains(key) {
            self.map.remove(key)
        } else {
            None
        }
    }

    /// Removes the entries for every in-range key of `keys` with a single copy.
    ///
    /// Keys outside the range are ignored; if none is in range the map is not
    /// written. Returns whether any entry was removed.
    pub fn remove_all<'k, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'k M::Key>,
        M::Key: 'k,
    {
        let keys: Vec<&M::Key> = keys
            .into_iter()
            .filter(|key| self.range.contains(key))
            .collect();
        if keys.is_empty() {
            return false;
        }
        self.map.cell().write(|map| {
            keys.into_iter()
                .fold(false, |changed, key| map.discard_entry(key).is_some() | changed)
        })
    }

    /// Returns a cursor over a snapshot of the in-range entries, in key order.
    ///
    /// [`Cursor::remove`] removes the last yielded entry from the live map.
    pub fn cursor(&self) -> Cursor<'a, M, (M::Key, M::Value)>
    where
        M::Value: Clone,
    {
        let entries: Vec<(M::Key, M::Value)> = self.read(|entries| {
            entries
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        });
        Cursor::over(self.map, entries, project_entry::<M::Key, M::Value>)
    }

    /// Removes every entry within the range.
    pub fn clear(&self) {
        self.map.retain(|key, _| !self.range.contains(key));
    }

    /// Keeps only the in-range entries for which `keep` returns `true`.
    /// Entries outside the range are kept.
    ///
    /// Returns whether any entry was removed.
    pub fn retain(&self, mut keep: impl FnMut(&M::Key, &M::Value) -> bool) -> bool {
        self.map
            .retain(|key, value| !self.range.contains(key) || keep(key, value))
    }

    /// Returns a view of the entries with keys in `from..to`.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::InvalidRange`] if `from` is greater than `to`, and
    /// [`CowError::KeyOutOfRange`] if either key lies outside this view.
    pub fn sub_map(&self, from: M::Key, to: M::Key) -> Result<Self, CowError> {
        self.range_map(Bound::Included(from), Bound::Excluded(to))
    }

    /// Returns a view of the entries with keys strictly less than `to`.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::KeyOutOfRange`] if `to` lies outside this view.
    pub fn head_map(&self, to: M::Key) -> Result<Self, CowError> {
        self.range_map(Bound::Unbounded, Bound::Excluded(to))
    }

    /// Returns a view of the entries with keys greater than or equal to `from`.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::KeyOutOfRange`] if `from` lies outside this view.
    pub fn tail_map(&self, from: M::Key) -> Result<Self, CowError> {
        self.range_map(Bound::Included(from), Bound::Unbounded)
    }

    /// Returns a view of the entries with keys between arbitrary bounds,
    /// restricted to this view.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::InvalidRange`] for inverted bounds and
    /// [`CowError::KeyOutOfRange`] for a bound outside this view.
    pub fn range_map(&self, lower: Bound<M::Key>, upper: Bound<M::Key>) -> Result<Self, CowError> {
        Ok(Self::new(self.map, self.range.narrow(lower, upper)?))
    }
}

impl<M> Clone for SubMap<'_, M>
where
    M: SortedMapStore,
    M::Key: Clone,
{
    fn clone(&self) -> Self {
        Self {
            map: self.map,
            range: self.range.clone(),
        }
    }
}

impl<M> PartialEq for SubMap<'_, M>
where
    M: SortedMapStore,
    M::Key: Ord + Clone,
    M::Value: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        let ours = self.map.snapshot();
        let theirs = other.map.snapshot();
        same_entries(
            ours.range_entries(self.range.lower(), self.range.upper()),
            theirs.range_entries(other.range.lower(), other.range.upper()),
        )
    }
}

impl<K, V, M> PartialEq<BTreeMap<K, V>> for SubMap<'_, M>
where
    M: SortedMapStore<Key = K, Value = V>,
    K: Ord + Clone,
    V: PartialEq,
{
    fn eq(&self, other: &BTreeMap<K, V>) -> bool {
        let ours = self.map.snapshot();
        same_entries(
            ours.range_entries(self.range.lower(), self.range.upper()),
            other.iter(),
        )
    }
}

// Entry-wise comparison of two ordered entry sequences borrowed for
// unrelated lifetimes.
fn same_entries<'l, 'r, K, V>(
    mut left: impl Iterator<Item = (&'l K, &'l V)>,
    mut right: impl Iterator<Item = (&'r K, &'r V)>,
) -> bool
where
    K: PartialEq + 'l + 'r,
    V: PartialEq + 'l + 'r,
{
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some((left_key, left_value)), Some((right_key, right_value)))
                if left_key == right_key && left_value == right_value => {}
            _ => return false,
        }
    }
}

impl<M> fmt::Debug for SubMap<'_, M>
where
    M: SortedMapStore,
    M::Key: Ord + Clone + fmt::Debug,
    M::Value: fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|entries| formatter.debug_map().entries(entries).finish())
    }
}
