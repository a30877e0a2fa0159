use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use super::LazyError;
use super::holder::{Attempt, LazyHolder, WaitPolicy};
use crate::cas;

type GenerationInitializer<T, E> = Box<dyn FnOnce() -> Result<Arc<T>, E> + Send>;
type Generation<T, E> = LazyHolder<Arc<T>, E, GenerationInitializer<T, E>>;

/// A lazy reference whose value can be discarded and recomputed, or cancelled.
///
/// The reference owns a swappable cell pointing at the current *generation*,
/// a compute-once holder built from the shared initializer. Reads behave like
/// [`LazyRef::get`](super::LazyRef::get) on the current generation.
/// [`reset`](Self::reset) atomically installs a fresh generation, and
/// [`cancel`](Self::cancel) installs a terminal one.
///
/// Values are handed out as [`Arc<T>`], so every caller that observes the same
/// generation receives the same allocation.
///
/// # Examples
///
/// ```rust
/// use synchrony::lazy::ResettableLazyRef;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let counter = AtomicUsize::new(0);
/// let lazy = ResettableLazyRef::from_fn(move || counter.fetch_add(1, Ordering::SeqCst));
///
/// assert_eq!(*lazy.get().unwrap(), 0);
/// assert_eq!(*lazy.get().unwrap(), 0);
///
/// // reset hands back the discarded value
/// assert_eq!(*lazy.reset().unwrap(), 0);
/// assert_eq!(*lazy.get().unwrap(), 1);
/// ```
pub struct ResettableLazyRef<T, E = Infallible, F = fn() -> Result<T, E>> {
    initializer: Arc<F>,
    current: ArcSwap<Generation<T, E>>,
    generation: AtomicU64,
}

impl<T, E, F> ResettableLazyRef<T, E, F>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
{
    /// Creates a resettable lazy reference around a reusable initializer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use synchrony::lazy::ResettableLazyRef;
    ///
    /// let lazy = ResettableLazyRef::new(|| "7".parse::<u8>());
    /// assert_eq!(lazy.get().ok().as_deref(), Some(&7));
    /// ```
    pub fn new(initializer: F) -> Self {
        let initializer = Arc::new(initializer);
        let first = Self::generation_for(&initializer);
        Self {
            initializer,
            current: ArcSwap::from_pointee(first),
            generation: AtomicU64::new(0),
        }
    }

    fn generation_for(initializer: &Arc<F>) -> Generation<T, E> {
        let initializer = Arc::clone(initializer);
        LazyHolder::new(Box::new(move || (*initializer)().map(Arc::new)))
    }

    /// Returns the current generation's value, computing it if needed.
    ///
    /// Callers waiting on a generation that gets replaced by `reset` or
    /// `cancel` stop waiting and retry against the replacement.
    ///
    /// # Errors
    ///
    /// Returns [`LazyError::Cancelled`] once the reference is cancelled, and
    /// the cached initialization failure of the current generation otherwise.
    pub fn get(&self) -> Result<Arc<T>, LazyError<E>> {
        self.resolve_current(false)
    }

    /// Like [`get`](Self::get), but a caller waiting for another thread's
    /// computation stops waiting when its thread is interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`LazyError::Interrupted`] when interrupted while waiting, in
    /// addition to the errors of [`get`](Self::get).
    pub fn get_interruptibly(&self) -> Result<Arc<T>, LazyError<E>> {
        self.resolve_current(true)
    }

    fn resolve_current(&self, interruptible: bool) -> Result<Arc<T>, LazyError<E>> {
        let policy = WaitPolicy::new(interruptible, true);
        loop {
            let holder = self.current.load_full();
            if let Some(value) = holder.peek() {
                return Ok(Arc::clone(value));
            }
            if let Attempt::Done(outcome) = holder.resolve(policy) {
                return outcome.map(Arc::clone);
            }
            tracing::trace!("generation replaced while waiting, re-reading current generation");
        }
    }

    /// Installs a fresh generation and returns the value of the one it replaced.
    ///
    /// If the replaced generation was never computed, it is computed now on
    /// this thread (or awaited, if another thread is computing it), so `reset`
    /// can block. Threads that were waiting on the replaced generation move on
    /// to the new one.
    ///
    /// # Errors
    ///
    /// Returns [`LazyError::Cancelled`] without changing anything if the
    /// reference is cancelled. Otherwise the swap always happens, and the
    /// replaced generation's failure, if any, is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use synchrony::lazy::ResettableLazyRef;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// let runs = AtomicU32::new(0);
    /// let lazy = ResettableLazyRef::from_fn(move || runs.fetch_add(1, Ordering::SeqCst) + 1);
    ///
    /// // The first generation was never requested; reset computes it.
    /// assert_eq!(*lazy.reset().unwrap(), 1);
    /// assert_eq!(*lazy.get().unwrap(), 2);
    /// ```
    pub fn reset(&self) -> Result<Arc<T>, LazyError<E>> {
        let fresh = Arc::new(Self::generation_for(&self.initializer));
        let previous = cas::get_and_update(&self.current, |current| {
            if current.is_cancelled() {
                Arc::clone(current)
            } else {
                Arc::clone(&fresh)
            }
        });
        if previous.is_cancelled() {
            return Err(LazyError::Cancelled);
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(generation, "lazy reference reset");
        previous.retire();
        previous.force(false).map(Arc::clone)
    }

    /// Cancels the reference permanently.
    ///
    /// Every later `get` fails with [`LazyError::Cancelled`] without blocking,
    /// and threads waiting on the current generation are released to observe
    /// the cancellation. An initializer that is already running is not
    /// aborted; the thread running it still receives its own result.
    ///
    /// Returns `true` if this call cancelled the reference, `false` if it was
    /// already cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = Arc::new(Generation::<T, E>::cancelled());
        let previous = cas::get_and_update(&self.current, |current| {
            if current.is_cancelled() {
                Arc::clone(current)
            } else {
                Arc::clone(&cancelled)
            }
        });
        if previous.is_cancelled() {
            return false;
        }

        tracing::debug!("lazy reference cancelled");
        previous.retire();
        true
    }
}

impl<T, E, F> ResettableLazyRef<T, E, F> {
    /// Returns whether the current generation has been computed successfully.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.current.load().is_resolved()
    }

    /// Returns whether the reference has been cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.current.load().is_cancelled()
    }

    /// Returns the current generation's value without blocking, if computed.
    pub fn try_get(&self) -> Option<Arc<T>> {
        self.current.load().peek().cloned()
    }

    /// Returns how many times the reference has been reset.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl<T> ResettableLazyRef<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a resettable lazy reference around an initializer that cannot fail.
    pub fn from_fn<G>(
        initializer: G,
    ) -> ResettableLazyRef<T, Infallible, impl Fn() -> Result<T, Infallible> + Send + Sync + 'static>
    where
        G: Fn() -> T + Send + Sync + 'static,
    {
        ResettableLazyRef::new(move || Ok(initializer()))
    }
}

impl<T: fmt::Debug, E, F> fmt::Debug for ResettableLazyRef<T, E, F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.load();
        let mut debug = formatter.debug_struct("ResettableLazyRef");
        debug.field("generation", &self.generation());
        match current.peek() {
            Some(value) => debug.field("value", value),
            None if current.is_cancelled() => debug.field("value", &format_args!("<cancelled>")),
            None if current.is_failed() => debug.field("value", &format_args!("<failed>")),
            None => debug.field("value", &format_args!("<uninit>")),
        };
        debug.finish()
    }
}
