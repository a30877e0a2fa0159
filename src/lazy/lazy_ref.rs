use std::convert::Infallible;
use std::fmt;

use super::LazyError;
use super::holder::LazyHolder;

/// A thread-safe reference whose value is computed at most once, on first demand.
///
/// `LazyRef<T, E, F>` defers a possibly-failing computation until the value is
/// first requested with [`get`](Self::get). If several threads ask at the same
/// time, exactly one runs the initializer and the others block until it
/// finishes; all of them observe the same outcome. A failure is cached and
/// replayed to every later caller, the initializer is never retried.
///
/// # Type Parameters
///
/// * `T` - The type of the computed value
/// * `E` - The error type of the initializer (defaults to [`Infallible`])
/// * `F` - The type of the initializer (defaults to `fn() -> Result<T, E>`)
///
/// # Examples
///
/// ```rust
/// use synchrony::lazy::LazyRef;
/// use std::sync::Arc;
/// use std::thread;
///
/// let lazy = Arc::new(LazyRef::from_fn(|| {
///     println!("Computing...");
///     42
/// }));
///
/// let handles: Vec<_> = (0..4).map(|_| {
///     let lazy = Arc::clone(&lazy);
///     thread::spawn(move || *lazy.force())
/// }).collect();
///
/// for handle in handles {
///     assert_eq!(handle.join().unwrap(), 42);
/// }
/// ```
pub struct LazyRef<T, E = Infallible, F = fn() -> Result<T, E>> {
    holder: LazyHolder<T, E, F>,
}

impl<T, E, F> LazyRef<T, E, F>
where
    F: FnOnce() -> Result<T, E>,
{
    /// Creates a lazy reference around a possibly-failing initializer.
    ///
    /// Only the holder is allocated; the initializer does not run until the
    /// value is first requested.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use synchrony::lazy::LazyRef;
    ///
    /// let lazy = LazyRef::new(|| "42".parse::<i32>());
    /// assert!(!lazy.is_initialized());
    /// assert_eq!(lazy.get().ok(), Some(&42));
    /// ```
    #[inline]
    pub fn new(initializer: F) -> Self {
        Self {
            holder: LazyHolder::new(initializer),
        }
    }

    /// Returns the value, computing it on this thread if nobody has yet.
    ///
    /// Once the value is resolved this is a single atomic load. While another
    /// thread is computing, the caller blocks; interruption of the caller is
    /// ignored for the duration of the wait (its interrupted status is left
    /// set for later handling).
    ///
    /// # Errors
    ///
    /// Returns [`LazyError::Initialization`] or [`LazyError::Panicked`] when
    /// the initializer failed, now or on an earlier call.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use synchrony::lazy::LazyRef;
    ///
    /// let lazy = LazyRef::new(|| Ok::<_, String>(vec![1, 2, 3]));
    /// assert_eq!(lazy.get().map(Vec::len).ok(), Some(3));
    /// ```
    #[inline]
    pub fn get(&self) -> Result<&T, LazyError<E>> {
        if let Some(value) = self.holder.peek() {
            return Ok(value);
        }
        self.holder.force(false)
    }

    /// Like [`get`](Self::get), but a caller waiting for another thread's
    /// computation stops waiting when its thread is interrupted.
    ///
    /// The thread running the initializer is never interrupted by this: once
    /// started, the initializer runs to completion.
    ///
    /// # Errors
    ///
    /// Returns [`LazyError::Interrupted`] when the calling thread is
    /// interrupted (see [`interrupt`](crate::interrupt)) while waiting. The
    /// interrupted status stays set. Initialization failures are reported as
    /// in [`get`](Self::get).
    pub fn get_interruptibly(&self) -> Result<&T, LazyError<E>> {
        if let Some(value) = self.holder.peek() {
            return Ok(value);
        }
        self.holder.force(true)
    }

    /// Consumes the reference and returns the value, computing it if needed.
    ///
    /// # Errors
    ///
    /// Returns the cached or freshly produced initialization failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use synchrony::lazy::LazyRef;
    ///
    /// let lazy = LazyRef::from_fn(|| String::from("owned"));
    /// assert_eq!(lazy.into_inner().unwrap(), "owned");
    /// ```
    pub fn into_inner(self) -> Result<T, LazyError<E>> {
        self.holder.into_outcome()
    }
}

impl<T, E, F> LazyRef<T, E, F> {
    /// Returns the value if it has been computed successfully, without blocking.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use synchrony::lazy::LazyRef;
    ///
    /// let lazy = LazyRef::from_fn(|| 42);
    /// assert!(lazy.try_get().is_none());
    /// let _ = lazy.force();
    /// assert_eq!(lazy.try_get(), Some(&42));
    /// ```
    #[inline]
    pub fn try_get(&self) -> Option<&T> {
        self.holder.peek()
    }

    /// Returns whether the value has been computed successfully.
    ///
    /// Never blocks and never triggers initialization.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.holder.is_resolved()
    }

    /// Returns whether the initializer ran and failed.
    #[inline]
    pub fn is_failed(&self) -> bool {
        self.holder.is_failed()
    }
}

impl<T, E> LazyRef<T, E, fn() -> Result<T, E>> {
    /// Creates a lazy reference that is already resolved.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use synchrony::lazy::LazyRef;
    ///
    /// let lazy: LazyRef<i32> = LazyRef::with_value(42);
    /// assert!(lazy.is_initialized());
    /// ```
    #[inline]
    pub fn with_value(value: T) -> Self {
        Self {
            holder: LazyHolder::resolved(value),
        }
    }
}

impl<T> LazyRef<T> {
    /// Creates a lazy reference around an initializer that cannot fail.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use synchrony::lazy::LazyRef;
    ///
    /// let lazy = LazyRef::from_fn(|| 6 * 7);
    /// assert_eq!(*lazy.force(), 42);
    /// ```
    pub fn from_fn<G>(initializer: G) -> LazyRef<T, Infallible, impl FnOnce() -> Result<T, Infallible>>
    where
        G: FnOnce() -> T,
    {
        LazyRef::new(move || Ok(initializer()))
    }
}

impl<T, F> LazyRef<T, Infallible, F>
where
    F: FnOnce() -> Result<T, Infallible>,
{
    /// Returns the value of an infallible lazy reference.
    ///
    /// # Panics
    ///
    /// Panics if the initializer panicked, now or on an earlier call.
    pub fn force(&self) -> &T {
        match self.get() {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }
}

impl<T: Default> Default for LazyRef<T> {
    /// Creates a lazy reference that computes the default value of `T`.
    fn default() -> Self {
        Self::new(|| Ok(T::default()))
    }
}

impl<T: fmt::Debug, E, F> fmt::Debug for LazyRef<T, E, F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.holder.peek() {
            Some(value) => formatter.debug_tuple("LazyRef").field(value).finish(),
            None if self.holder.is_failed() => formatter.write_str("LazyRef(<failed>)"),
            None => formatter.write_str("LazyRef(<uninit>)"),
        }
    }
}

impl<T: fmt::Display, E, F> fmt::Display for LazyRef<T, E, F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.holder.peek() {
            Some(value) => fmt::Display::fmt(value, formatter),
            None if self.holder.is_failed() => formatter.write_str("<failed>"),
            None => formatter.write_str("<uninit>"),
        }
    }
}
