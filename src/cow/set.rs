use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::map::SnapshotIter;
use super::{CopyOnWrite, SetStore};

/// A thread-safe set that applies every mutation to a fresh copy of its
/// backing set and publishes the copy atomically.
///
/// The set counterpart of [`CowMap`](super::CowMap): reads are lock-free,
/// writers are serialized, and iterators walk a point-in-time snapshot.
///
/// # Examples
///
/// ```rust
/// use synchrony::cow::CowSet;
/// use std::collections::BTreeSet;
///
/// let tags = CowSet::new(BTreeSet::from(["alpha", "beta"]));
/// let before = tags.iter();
///
/// assert!(tags.insert("gamma"));
/// assert!(!tags.insert("alpha"));
///
/// assert_eq!(before.collect::<Vec<_>>(), vec!["alpha", "beta"]);
/// assert_eq!(tags.len(), 3);
/// ```
pub struct CowSet<S> {
    inner: CopyOnWrite<S>,
}

impl<S: SetStore> CowSet<S> {
    /// Creates a set that copies its backing set with [`Clone`].
    pub fn new(initial: S) -> Self
    where
        S: Clone + 'static,
    {
        Self {
            inner: CopyOnWrite::new(initial),
        }
    }

    /// Creates a set with a custom copy function for the backing set.
    pub fn with_copier<P>(initial: S, copier: P) -> Self
    where
        P: Fn(&S) -> S + Send + Sync + 'static,
    {
        Self {
            inner: CopyOnWrite::with_copier(initial, copier),
        }
    }

    /// Returns the currently published backing set.
    #[inline]
    pub fn snapshot(&self) -> Arc<S> {
        self.inner.snapshot()
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read(SetStore::item_count)
    }

    /// Returns `true` if the set holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether `item` is present.
    pub fn contains(&self, item: &S::Item) -> bool {
        self.inner.read(|set| set.contains_item(item))
    }

    /// Adds `item`, returning whether it was newly inserted.
    pub fn insert(&self, item: S::Item) -> bool {
        self.inner.write(|set| set.insert_item(item))
    }

    /// Removes `item`, returning whether it was present.
    pub fn remove(&self, item: &S::Item) -> bool {
        self.inner.write(|set| set.remove_item(item))
    }

    /// Adds every element of `items` with a single copy and publication.
    ///
    /// Returns whether any element was newly inserted.
    pub fn insert_all<I>(&self, items: I) -> bool
    where
        I: IntoIterator<Item = S::Item>,
    {
        self.inner.write(|set| {
            items
                .into_iter()
                .fold(false, |changed, item| set.insert_item(item) | changed)
        })
    }

    /// Removes every element of `items` with a single copy and publication.
    ///
    /// Returns whether any element was removed.
    pub fn remove_all<'i, I>(&self, items: I) -> bool
    where
        I: IntoIterator<Item = &'i S::Item>,
        S::Item: 'i,
    {
        self.inner.write(|set| {
            items
                .into_iter()
                .fold(false, |changed, item| set.remove_item(item) | changed)
        })
    }

    /// Keeps only the elements for which `keep` returns `true`.
    ///
    /// Returns whether any element was removed.
    pub fn retain(&self, mut keep: impl FnMut(&S::Item) -> bool) -> bool {
        self.inner.write(|set| {
            let before = set.item_count();
            set.retain_items(&mut keep);
            set.item_count() != before
        })
    }

    /// Removes every element.
    pub fn clear(&self) {
        self.inner.write(SetStore::clear_items);
    }

    /// Iterates over a snapshot of the elements.
    pub fn iter(&self) -> SnapshotIter<S::Item>
    where
        S::Item: Clone,
    {
        SnapshotIter::new(self.inner.read(|set| set.iter_items().cloned().collect()))
    }

    /// Returns the number of writes published since construction.
    #[inline]
    pub fn version(&self) -> u64 {
        self.inner.version()
    }
}

impl<S: SetStore + Clone + 'static> From<S> for CowSet<S> {
    fn from(initial: S) -> Self {
        Self::new(initial)
    }
}

impl<S> FromIterator<S::Item> for CowSet<S>
where
    S: SetStore + FromIterator<S::Item> + Clone + 'static,
{
    fn from_iter<I: IntoIterator<Item = S::Item>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<S: SetStore + Default + Clone + 'static> Default for CowSet<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Clone for CowSet<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, S> IntoIterator for &'a CowSet<S>
where
    S: SetStore,
    S::Item: Clone,
{
    type Item = S::Item;
    type IntoIter = SnapshotIter<S::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<S: fmt::Debug> fmt::Debug for CowSet<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.read(|set| fmt::Debug::fmt(set, formatter))
    }
}

impl<S: PartialEq> PartialEq for CowSet<S> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<S: Eq> Eq for CowSet<S> {}

impl<S: PartialEq> PartialEq<S> for CowSet<S> {
    fn eq(&self, other: &S) -> bool {
        self.inner == *other
    }
}

impl<S: Hash> Hash for CowSet<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

#[cfg(feature = "serde")]
impl<S: serde::Serialize> serde::Serialize for CowSet<S> {
    fn serialize<Z>(&self, serializer: Z) -> Result<Z::Ok, Z::Error>
    where
        Z: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, S> serde::Deserialize<'de> for CowSet<S>
where
    S: SetStore + serde::Deserialize<'de> + Clone + 'static,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        S::deserialize(deserializer).map(Self::new)
    }
}
