//! The copy-on-write map and its derived views.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::iter::FusedIterator;
use std::sync::Arc;

use super::{CopyOnWrite, CowError, MapStore};

/// A thread-safe map that applies every mutation to a fresh copy of its
/// backing map and publishes the copy atomically.
///
/// Reads never block and always see a complete, consistent map. Writers are
/// serialized and each pays for a full copy, so `CowMap` suits maps that are
/// read far more often than they are written.
///
/// Any [`MapStore`] can back the map; `HashMap` and `BTreeMap` work out of the
/// box. With a `BTreeMap` the map also offers ordered operations, see
/// [`CowSortedMap`](super::CowSortedMap).
///
/// Iteration, on the map or on its views, walks a point-in-time snapshot:
/// later writes never show up in an iterator that already exists.
///
/// # Examples
///
/// ```rust
/// use synchrony::cow::CowMap;
/// use std::collections::HashMap;
///
/// let scores = CowMap::new(HashMap::from([("alice", 3), ("bob", 5)]));
/// let values = scores.values().iter();
///
/// scores.put("carol", 8);
///
/// assert_eq!(values.len(), 2);
/// assert_eq!(scores.values().len(), 3);
/// assert_eq!(scores.get(&"carol"), Some(8));
/// ```
pub struct CowMap<M> {
    inner: CopyOnWrite<M>,
}

impl<M: MapStore> CowMap<M> {
    /// Creates a map that copies its backing map with [`Clone`].
    pub fn new(initial: M) -> Self
    where
        M: Clone + 'static,
    {
        Self {
            inner: CopyOnWrite::new(initial),
        }
    }

    /// Creates a map with a custom copy function for the backing map.
    ///
    /// See [`CopyOnWrite::with_copier`] for the contract `copier` must honour.
    pub fn with_copier<P>(initial: M, copier: P) -> Self
    where
        P: Fn(&M) -> M + Send + Sync + 'static,
    {
        Self {
            inner: CopyOnWrite::with_copier(initial, copier),
        }
    }

    /// Returns the currently published backing map.
    #[inline]
    pub fn snapshot(&self) -> Arc<M> {
        self.inner.snapshot()
    }

    /// Runs `reader` against the currently published backing map.
    #[inline]
    pub fn read<R>(&self, reader: impl FnOnce(&M) -> R) -> R {
        self.inner.read(reader)
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read(MapStore::entry_count)
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &M::Key) -> Option<M::Value>
    where
        M::Value: Clone,
    {
        self.inner.read(|map| map.lookup(key).cloned())
    }

    /// Returns whether an entry exists for `key`.
    pub fn contains_key(&self, key: &M::Key) -> bool {
        self.inner.read(|map| map.lookup(key).is_some())
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn put(&self, key: M::Key, value: M::Value) -> Option<M::Value> {
        self.inner.write(|map| map.store_entry(key, value))
    }

    /// Removes the entry for `key`, returning its value.
    pub fn remove(&self, key: &M::Key) -> Option<M::Value> {
        self.inner.write(|map| map.discard_entry(key))
    }

    /// Stores every entry of `entries` with a single copy and publication.
    pub fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (M::Key, M::Value)>,
    {
        self.inner.write(|map| {
            for (key, value) in entries {
                map.store_entry(key, value);
            }
        });
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.write(MapStore::clear_entries);
    }

    /// Keeps only the entries for which `keep` returns `true`.
    ///
    /// Returns whether any entry was removed.
    pub fn retain(&self, mut keep: impl FnMut(&M::Key, &M::Value) -> bool) -> bool {
        self.inner.write(|map| {
            let before = map.entry_count();
            map.retain_entries(&mut keep);
            map.entry_count() != before
        })
    }

    /// Returns the number of writes published since construction.
    #[inline]
    pub fn version(&self) -> u64 {
        self.inner.version()
    }

    /// Iterates over a snapshot of the entries.
    pub fn iter(&self) -> SnapshotIter<(M::Key, M::Value)>
    where
        M::Key: Clone,
        M::Value: Clone,
    {
        SnapshotIter::new(self.collect_entries())
    }

    /// Returns a view of the keys.
    #[inline]
    pub const fn keys(&self) -> KeySet<'_, M> {
        KeySet { map: self }
    }

    /// Returns a view of the values.
    #[inline]
    pub const fn values(&self) -> Values<'_, M> {
        Values { map: self }
    }

    /// Returns a view of the entries.
    #[inline]
    pub const fn entries(&self) -> EntrySet<'_, M> {
        EntrySet { map: self }
    }

    /// Returns a cursor over a snapshot of the entries that can remove the
    /// entry it last yielded from the live map.
    pub fn cursor(&self) -> Cursor<'_, M, (M::Key, M::Value)>
    where
        M::Key: Clone,
        M::Value: Clone,
    {
        Cursor::new(self, project_entry::<M::Key, M::Value>)
    }

    fn collect_entries(&self) -> Vec<(M::Key, M::Value)>
    where
        M::Key: Clone,
        M::Value: Clone,
    {
        self.inner.read(|map| {
            map.iter_entries()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
    }

    pub(crate) const fn cell(&self) -> &CopyOnWrite<M> {
        &self.inner
    }
}

impl<M> From<CopyOnWrite<M>> for CowMap<M> {
    fn from(inner: CopyOnWrite<M>) -> Self {
        Self { inner }
    }
}

impl<M: MapStore + Clone + 'static> From<M> for CowMap<M> {
    fn from(initial: M) -> Self {
        Self::new(initial)
    }
}

impl<M> FromIterator<(M::Key, M::Value)> for CowMap<M>
where
    M: MapStore + FromIterator<(M::Key, M::Value)> + Clone + 'static,
{
    fn from_iter<I: IntoIterator<Item = (M::Key, M::Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<M: MapStore + Default + Clone + 'static> Default for CowMap<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M> Clone for CowMap<M> {
    /// Creates an independent map holding a copy of the current entries.
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, M> IntoIterator for &'a CowMap<M>
where
    M: MapStore,
    M::Key: Clone,
    M::Value: Clone,
{
    type Item = (M::Key, M::Value);
    type IntoIter = SnapshotIter<(M::Key, M::Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<M: fmt::Debug> fmt::Debug for CowMap<M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.read(|map| fmt::Debug::fmt(map, formatter))
    }
}

impl<M: PartialEq> PartialEq for CowMap<M> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<M: Eq> Eq for CowMap<M> {}

impl<M: PartialEq> PartialEq<M> for CowMap<M> {
    fn eq(&self, other: &M) -> bool {
        self.inner == *other
    }
}

impl<M: Hash> Hash for CowMap<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

#[cfg(feature = "serde")]
impl<M: serde::Serialize> serde::Serialize for CowMap<M> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, M> serde::Deserialize<'de> for CowMap<M>
where
    M: MapStore + serde::Deserialize<'de> + Clone + 'static,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        M::deserialize(deserializer).map(Self::new)
    }
}

fn project_key<K: Clone, V>(key: &K, _value: V) -> K {
    key.clone()
}

fn project_value<K, V>(_key: &K, value: V) -> V {
    value
}

pub(crate) fn project_entry<K: Clone, V>(key: &K, value: V) -> (K, V) {
    (key.clone(), value)
}

// =============================================================================
// SnapshotIter
// =============================================================================

/// An owning iterator over a point-in-time snapshot.
///
/// Created by the `iter` methods of the copy-on-write collections and their
/// views. The snapshot is taken when the iterator is created.
#[derive(Debug, Clone)]
pub struct SnapshotIter<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> SnapshotIter<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<T> Iterator for SnapshotIter<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.items.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T> DoubleEndedIterator for SnapshotIter<T> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.items.next_back()
    }
}

impl<T> ExactSizeIterator for SnapshotIter<T> {}

impl<T> FusedIterator for SnapshotIter<T> {}

// =============================================================================
// Cursor
// =============================================================================

/// An iterator over a snapshot of a [`CowMap`] that can remove, from the live
/// map, the entry it yielded last.
///
/// Removal goes through the map's copy-on-write protocol and never affects
/// the snapshot being iterated.
///
/// # Examples
///
/// ```rust
/// use synchrony::cow::CowMap;
/// use std::collections::BTreeMap;
///
/// let map = CowMap::new(BTreeMap::from([(1, "odd"), (2, "even"), (3, "odd")]));
/// let mut cursor = map.keys().cursor();
/// while let Some(key) = cursor.next() {
///     if key % 2 == 1 {
///         cursor.remove().unwrap();
///     }
/// }
/// assert_eq!(map.keys().iter().collect::<Vec<_>>(), vec![2]);
/// ```
pub struct Cursor<'a, M: MapStore, T> {
    map: &'a CowMap<M>,
    remaining: std::vec::IntoIter<(M::Key, M::Value)>,
    project: fn(&M::Key, M::Value) -> T,
    current: Option<M::Key>,
}

impl<'a, M, T> Cursor<'a, M, T>
where
    M: MapStore,
    M::Key: Clone,
    M::Value: Clone,
{
    fn new(map: &'a CowMap<M>, project: fn(&M::Key, M::Value) -> T) -> Self {
        Self::over(map, map.collect_entries(), project)
    }

    // Iterates `entries`, a snapshot taken from `map` by the caller.
    pub(crate) fn over(
        map: &'a CowMap<M>,
        entries: Vec<(M::Key, M::Value)>,
        project: fn(&M::Key, M::Value) -> T,
    ) -> Self {
        Self {
            map,
            remaining: entries.into_iter(),
            project,
            current: None,
        }
    }

    /// Removes the entry most recently yielded by [`next`](Iterator::next)
    /// from the live map.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::NoCurrentElement`] if nothing has been yielded yet,
    /// or if the current entry was already removed.
    pub fn remove(&mut self) -> Result<(), CowError> {
        let key = self.current.take().ok_or(CowError::NoCurrentElement)?;
        self.map.remove(&key);
        Ok(())
    }
}

impl<M: MapStore, T> Iterator for Cursor<'_, M, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let (key, value) = self.remaining.next()?;
        let item = (self.project)(&key, value);
        self.current = Some(key);
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.remaining.size_hint()
    }
}

impl<M: MapStore, T> ExactSizeIterator for Cursor<'_, M, T> {}

// =============================================================================
// KeySet
// =============================================================================

/// A live view of the keys of a [`CowMap`].
///
/// Reads go to the currently published map. Removals are applied to the map
/// through its copy-on-write protocol; insertions are rejected because a key
/// alone does not describe an entry.
pub struct KeySet<'a, M> {
    map: &'a CowMap<M>,
}

impl<'a, M: MapStore> KeySet<'a, M> {
    const VIEW: &'static str = "key set";

    /// Returns the number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns whether `key` is present.
    #[inline]
    pub fn contains(&self, key: &M::Key) -> bool {
        self.map.contains_key(key)
    }

    /// Iterates over a snapshot of the keys.
    pub fn iter(&self) -> SnapshotIter<M::Key>
    where
        M::Key: Clone,
    {
        SnapshotIter::new(
            self.map
                .read(|map| map.iter_entries().map(|(key, _)| key.clone()).collect()),
        )
    }

    /// Returns a cursor over a snapshot of the keys.
    pub fn cursor(&self) -> Cursor<'a, M, M::Key>
    where
        M::Key: Clone,
        M::Value: Clone,
    {
        Cursor::new(self.map, project_key::<M::Key, M::Value>)
    }

    /// Removes the entry for `key`, returning whether one existed.
    pub fn remove(&self, key: &M::Key) -> bool {
        self.map.remove(key).is_some()
    }

    /// Removes the entries for every key in `keys` with a single copy.
    ///
    /// Returns whether any entry was removed.
    pub fn remove_all<'k, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'k M::Key>,
        M::Key: 'k,
    {
        self.map.cell().write(|map| {
            let mut changed = false;
            for key in keys {
                changed |= map.discard_entry(key).is_some();
            }
            changed
        })
    }

    /// Keeps only the entries whose key satisfies `keep`.
    ///
    /// Returns whether any entry was removed.
    pub fn retain(&self, mut keep: impl FnMut(&M::Key) -> bool) -> bool {
        self.map.retain(|key, _| keep(key))
    }

    /// Removes every entry of the map.
    pub fn clear(&self) {
        self.map.clear();
    }

    /// Always fails: keys cannot be added without values.
    ///
    /// # Errors
    ///
    /// Always returns [`CowError::Unsupported`].
    pub fn insert(&self, _key: M::Key) -> Result<bool, CowError> {
        Err(CowError::unsupported(Self::VIEW, "insert"))
    }

    /// Always fails: keys cannot be added without values.
    ///
    /// # Errors
    ///
    /// Always returns [`CowError::Unsupported`].
    pub fn insert_all<I>(&self, _keys: I) -> Result<bool, CowError>
    where
        I: IntoIterator<Item = M::Key>,
    {
        Err(CowError::unsupported(Self::VIEW, "insert_all"))
    }

    fn same_keys<N>(&self, other_len: usize, contains: N) -> bool
    where
        N: Fn(&M::Key) -> bool,
    {
        self.map.read(|map| {
            map.entry_count() == other_len && map.iter_entries().all(|(key, _)| contains(key))
        })
    }
}

impl<M> Clone for KeySet<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for KeySet<'_, M> {}

impl<M: MapStore> PartialEq for KeySet<'_, M> {
    fn eq(&self, other: &Self) -> bool {
        let theirs = other.map.snapshot();
        self.same_keys(theirs.entry_count(), |key| theirs.lookup(key).is_some())
    }
}

impl<M: MapStore> Eq for KeySet<'_, M> {}

impl<M> Hash for KeySet<'_, M>
where
    M: MapStore,
    M::Key: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.map
            .read(|map| hash_unordered(map.iter_entries().map(|(key, _)| key), state));
    }
}

impl<M, S> PartialEq<HashSet<M::Key, S>> for KeySet<'_, M>
where
    M: MapStore,
    M::Key: Eq + Hash,
    S: BuildHasher,
{
    fn eq(&self, other: &HashSet<M::Key, S>) -> bool {
        self.same_keys(other.len(), |key| other.contains(key))
    }
}

impl<M> PartialEq<BTreeSet<M::Key>> for KeySet<'_, M>
where
    M: MapStore,
    M::Key: Ord,
{
    fn eq(&self, other: &BTreeSet<M::Key>) -> bool {
        self.same_keys(other.len(), |key| other.contains(key))
    }
}

impl<M> fmt::Debug for KeySet<'_, M>
where
    M: MapStore,
    M::Key: fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.map.read(|map| {
            formatter
                .debug_set()
                .entries(map.iter_entries().map(|(key, _)| key))
                .finish()
        })
    }
}

// =============================================================================
// Values
// =============================================================================

/// A live view of the values of a [`CowMap`].
///
/// Removal by value drops one entry holding that value. Insertions are
/// rejected because a value alone does not describe an entry.
pub struct Values<'a, M> {
    map: &'a CowMap<M>,
}

impl<'a, M: MapStore> Values<'a, M> {
    const VIEW: &'static str = "values view";

    /// Returns the number of values, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns whether any entry holds `value`.
    pub fn contains(&self, value: &M::Value) -> bool
    where
        M::Value: PartialEq,
    {
        self.map
            .read(|map| map.iter_entries().any(|(_, candidate)| candidate == value))
    }

    /// Iterates over a snapshot of the values.
    pub fn iter(&self) -> SnapshotIter<M::Value>
    where
        M::Value: Clone,
    {
        SnapshotIter::new(
            self.map
                .read(|map| map.iter_entries().map(|(_, value)| value.clone()).collect()),
        )
    }

    /// Returns a cursor over a snapshot of the values.
    pub fn cursor(&self) -> Cursor<'a, M, M::Value>
    where
        M::Key: Clone,
        M::Value: Clone,
    {
        Cursor::new(self.map, project_value::<M::Key, M::Value>)
    }

    /// Removes one entry holding `value`, returning whether one existed.
    pub fn remove(&self, value: &M::Value) -> bool
    where
        M::Key: Clone,
        M::Value: PartialEq,
    {
        self.map.cell().write(|map| {
            let key = map
                .iter_entries()
                .find(|(_, candidate)| *candidate == value)
                .map(|(key, _)| key.clone());
            key.is_some_and(|key| map.discard_entry(&key).is_some())
        })
    }

    /// Removes every entry whose value appears in `values`.
    ///
    /// Returns whether any entry was removed.
    pub fn remove_all(&self, values: &[M::Value]) -> bool
    where
        M::Value: PartialEq,
    {
        self.map.retain(|_, value| !values.contains(value))
    }

    /// Keeps only the entries whose value satisfies `keep`.
    ///
    /// Returns whether any entry was removed.
    pub fn retain(&self, mut keep: impl FnMut(&M::Value) -> bool) -> bool {
        self.map.retain(|_, value| keep(value))
    }

    /// Removes every entry of the map.
    pub fn clear(&self) {
        self.map.clear();
    }

    /// Always fails: values cannot be added without keys.
    ///
    /// # Errors
    ///
    /// Always returns [`CowError::Unsupported`].
    pub fn insert(&self, _value: M::Value) -> Result<bool, CowError> {
        Err(CowError::unsupported(Self::VIEW, "insert"))
    }

    /// Always fails: values cannot be added without keys.
    ///
    /// # Errors
    ///
    /// Always returns [`CowError::Unsupported`].
    pub fn insert_all<I>(&self, _values: I) -> Result<bool, CowError>
    where
        I: IntoIterator<Item = M::Value>,
    {
        Err(CowError::unsupported(Self::VIEW, "insert_all"))
    }
}

impl<M> Clone for Values<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Values<'_, M> {}

impl<M> fmt::Debug for Values<'_, M>
where
    M: MapStore,
    M::Value: fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.map.read(|map| {
            formatter
                .debug_list()
                .entries(map.iter_entries().map(|(_, value)| value))
                .finish()
        })
    }
}

// =============================================================================
// EntrySet
// =============================================================================

/// A live view of the entries of a [`CowMap`].
///
/// Entries can be removed, but only when both key and value match. Insertions
/// are rejected; use [`CowMap::put`] instead.
pub struct EntrySet<'a, M> {
    map: &'a CowMap<M>,
}

impl<'a, M: MapStore> EntrySet<'a, M> {
    const VIEW: &'static str = "entry set";

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns whether the map holds exactly this entry.
    pub fn contains(&self, key: &M::Key, value: &M::Value) -> bool
    where
        M::Value: PartialEq,
    {
        self.map
            .read(|map| map.lookup(key).is_some_and(|current| current == value))
    }

    /// Iterates over a snapshot of the entries.
    pub fn iter(&self) -> SnapshotIter<(M::Key, M::Value)>
    where
        M::Key: Clone,
        M::Value: Clone,
    {
        self.map.iter()
    }

    /// Returns a cursor over a snapshot of the entries.
    pub fn cursor(&self) -> Cursor<'a, M, (M::Key, M::Value)>
    where
        M::Key: Clone,
        M::Value: Clone,
    {
        Cursor::new(self.map, project_entry::<M::Key, M::Value>)
    }

    /// Removes the entry if the map holds exactly this entry.
    ///
    /// Returns whether the entry was removed.
    pub fn remove(&self, key: &M::Key, value: &M::Value) -> bool
    where
        M::Value: PartialEq,
    {
        self.map.cell().write(|map| {
            if map.lookup(key).is_some_and(|current| current == value) {
                map.discard_entry(key).is_some()
            } else {
                false
            }
        })
    }

    /// Removes every listed entry the map holds exactly.
    ///
    /// Returns whether any entry was removed.
    pub fn remove_all(&self, entries: &[(M::Key, M::Value)]) -> bool
    where
        M::Key: PartialEq,
        M::Value: PartialEq,
    {
        self.map.retain(|key, value| {
            !entries
                .iter()
                .any(|(other_key, other_value)| other_key == key && other_value == value)
        })
    }

    /// Keeps only the entries that satisfy `keep`.
    ///
    /// Returns whether any entry was removed.
    pub fn retain(&self, keep: impl FnMut(&M::Key, &M::Value) -> bool) -> bool {
        self.map.retain(keep)
    }

    /// Removes every entry of the map.
    pub fn clear(&self) {
        self.map.clear();
    }

    /// Always fails: use [`CowMap::put`] to add entries.
    ///
    /// # Errors
    ///
    /// Always returns [`CowError::Unsupported`].
    pub fn insert(&self, _entry: (M::Key, M::Value)) -> Result<bool, CowError> {
        Err(CowError::unsupported(Self::VIEW, "insert"))
    }

    /// Always fails: use [`CowMap::put_all`] to add entries.
    ///
    /// # Errors
    ///
    /// Always returns [`CowError::Unsupported`].
    pub fn insert_all<I>(&self, _entries: I) -> Result<bool, CowError>
    where
        I: IntoIterator<Item = (M::Key, M::Value)>,
    {
        Err(CowError::unsupported(Self::VIEW, "insert_all"))
    }
}

impl<M> Clone for EntrySet<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for EntrySet<'_, M> {}

impl<M> PartialEq for EntrySet<'_, M>
where
    M: MapStore,
    M::Value: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        let theirs = other.map.snapshot();
        self.map.read(|map| {
            map.entry_count() == theirs.entry_count()
                && map
                    .iter_entries()
                    .all(|(key, value)| theirs.lookup(key) == Some(value))
        })
    }
}

impl<M> PartialEq<M> for EntrySet<'_, M>
where
    M: MapStore,
    M::Value: PartialEq,
{
    fn eq(&self, other: &M) -> bool {
        self.map.read(|map| {
            map.entry_count() == other.entry_count()
                && map
                    .iter_entries()
                    .all(|(key, value)| other.lookup(key) == Some(value))
        })
    }
}

impl<M> Hash for EntrySet<'_, M>
where
    M: MapStore,
    M::Key: Hash,
    M::Value: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.map.read(|map| hash_unordered(map.iter_entries(), state));
    }
}

impl<M> fmt::Debug for EntrySet<'_, M>
where
    M: MapStore,
    M::Key: fmt::Debug,
    M::Value: fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.map.read(|map| formatter.debug_set().entries(map.iter_entries()).finish())
    }
}

/// Hashes `items` so that the result does not depend on iteration order.
///
/// Each item is hashed on its own with fixed keys and the digests are summed,
/// so a hash map and a sorted map holding the same items agree.
fn hash_unordered<I, H>(items: I, state: &mut H)
where
    I: Iterator,
    I::Item: Hash,
    H: Hasher,
{
    let (count, sum) = items.fold((0_usize, 0_u64), |(count, sum), item| {
        let mut hasher = DefaultHasher::new();
        item.hash(&mut hasher);
        (count + 1, sum.wrapping_add(hasher.finish()))
    });
    state.write_usize(count);
    state.write_u64(sum);
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeMap;

    #[rstest]
    fn test_serialize_current_contents() {
        let map = CowMap::new(BTreeMap::from([("a", 1), ("b", 2)]));
        map.put("c", 3);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a":1,"b":2,"c":3}"#);
    }

    #[rstest]
    fn test_deserialize() {
        let map: CowMap<BTreeMap<String, i32>> = serde_json::from_str(r#"{"x":1}"#).unwrap();
        assert_eq!(map.get(&"x".to_string()), Some(1));
        assert_eq!(map.version(), 0);
    }
}
