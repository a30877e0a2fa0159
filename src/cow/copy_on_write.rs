use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

type CopyFn<C> = Arc<dyn Fn(&C) -> C + Send + Sync>;

/// A value that is mutated by replacing it with a modified copy.
///
/// `CopyOnWrite<C>` publishes an immutable backing instance through an atomic
/// pointer. Readers load the current instance without locking and never
/// block. Writers are admitted one at a time; each one copies the current
/// instance with the configured copy function, applies its mutation to the
/// private copy, publishes the copy, and only then returns.
///
/// A snapshot obtained with [`snapshot`](Self::snapshot) is never modified;
/// later writes are visible only through later reads.
///
/// # Examples
///
/// ```rust
/// use synchrony::cow::CopyOnWrite;
///
/// let numbers = CopyOnWrite::new(vec![1, 2, 3]);
/// let before = numbers.snapshot();
///
/// numbers.write(|numbers| numbers.push(4));
///
/// assert_eq!(*before, vec![1, 2, 3]);
/// assert_eq!(*numbers.snapshot(), vec![1, 2, 3, 4]);
/// ```
pub struct CopyOnWrite<C> {
    current: ArcSwap<C>,
    writer: Mutex<()>,
    copier: CopyFn<C>,
    version: AtomicU64,
}

impl<C> CopyOnWrite<C> {
    /// Creates a copy-on-write cell that copies with [`Clone`].
    ///
    /// The initial value is copied once, so the caller's instance is never
    /// shared with the cell.
    pub fn new(initial: C) -> Self
    where
        C: Clone + 'static,
    {
        Self::with_copier(initial, C::clone)
    }

    /// Creates a copy-on-write cell with a custom copy function.
    ///
    /// `copier` must produce an independent instance with the same contents
    /// and semantics as its argument. It is invoked once here to materialize
    /// the initial backing instance, and once per write afterwards.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use synchrony::cow::CopyOnWrite;
    /// use std::collections::BTreeSet;
    ///
    /// let ids = CopyOnWrite::with_copier(BTreeSet::from([1_u32]), |ids: &BTreeSet<u32>| {
    ///     ids.iter().copied().collect()
    /// });
    /// ids.write(|ids| ids.insert(2));
    /// assert_eq!(ids.read(BTreeSet::len), 2);
    /// ```
    pub fn with_copier<P>(initial: C, copier: P) -> Self
    where
        P: Fn(&C) -> C + Send + Sync + 'static,
    {
        let copier: CopyFn<C> = Arc::new(copier);
        let backing = (*copier)(&initial);
        Self {
            current: ArcSwap::from_pointee(backing),
            writer: Mutex::new(()),
            copier,
            version: AtomicU64::new(0),
        }
    }

    /// Returns the currently published instance.
    ///
    /// Lock-free; the returned snapshot stays unchanged forever.
    #[inline]
    pub fn snapshot(&self) -> Arc<C> {
        self.current.load_full()
    }

    /// Runs `reader` against the currently published instance.
    ///
    /// Lock-free. Keep `reader` short; use [`snapshot`](Self::snapshot) to hold
    /// on to an instance.
    #[inline]
    pub fn read<R>(&self, reader: impl FnOnce(&C) -> R) -> R {
        let current = self.current.load();
        reader(&**current)
    }

    /// Applies one mutation through the copy-mutate-publish protocol.
    ///
    /// Concurrent writers are serialized; readers are never blocked.
    pub fn write<R>(&self, mutation: impl FnOnce(&mut C) -> R) -> R {
        let _admission = self.writer.lock();
        let current = self.current.load();
        let mut working = (self.copier)(&**current);
        let result = mutation(&mut working);
        self.publish(working);
        result
    }

    /// Like [`write`](Self::write), but publishes only if `mutation` succeeds.
    ///
    /// # Errors
    ///
    /// Returns the mutation's error; the published instance is then unchanged.
    pub fn try_write<R, E>(&self, mutation: impl FnOnce(&mut C) -> Result<R, E>) -> Result<R, E> {
        let _admission = self.writer.lock();
        let current = self.current.load();
        let mut working = (self.copier)(&**current);
        let result = mutation(&mut working)?;
        self.publish(working);
        Ok(result)
    }

    fn publish(&self, working: C) {
        self.current.store(Arc::new(working));
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(version, "copy-on-write instance published");
    }

    /// Returns the number of writes published so far.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Returns an independent copy of the current contents, made with the
    /// copy function.
    pub fn copy_current(&self) -> C {
        let current = self.current.load();
        (self.copier)(&**current)
    }
}

impl<C> Clone for CopyOnWrite<C> {
    /// Creates an independent cell holding a copy of the current instance.
    fn clone(&self) -> Self {
        Self {
            current: ArcSwap::from_pointee(self.copy_current()),
            writer: Mutex::new(()),
            copier: Arc::clone(&self.copier),
            version: AtomicU64::new(0),
        }
    }
}

impl<C: Default + Clone + 'static> Default for CopyOnWrite<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: fmt::Debug> fmt::Debug for CopyOnWrite<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("CopyOnWrite")
            .field(&*self.current.load())
            .finish()
    }
}

impl<C: PartialEq> PartialEq for CopyOnWrite<C> {
    fn eq(&self, other: &Self) -> bool {
        *self.current.load() == *other.current.load()
    }
}

impl<C: Eq> Eq for CopyOnWrite<C> {}

impl<C: PartialEq> PartialEq<C> for CopyOnWrite<C> {
    fn eq(&self, other: &C) -> bool {
        **self.current.load() == *other
    }
}

impl<C: Hash> Hash for CopyOnWrite<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.current.load().hash(state);
    }
}

#[cfg(feature = "serde")]
impl<C: serde::Serialize> serde::Serialize for CopyOnWrite<C> {
    /// Serializes the currently published instance.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.read(|current| current.serialize(serializer))
    }
}

#[cfg(feature = "serde")]
impl<'de, C> serde::Deserialize<'de> for CopyOnWrite<C>
where
    C: serde::Deserialize<'de> + Clone + 'static,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        C::deserialize(deserializer).map(Self::new)
    }
}
