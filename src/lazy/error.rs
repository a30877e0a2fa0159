use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Error returned when a lazy reference cannot produce its value.
///
/// An initialization failure is cached: every caller that reaches the same
/// holder receives a clone of the same error, sharing the original cause
/// through an [`Arc`].
///
/// # Examples
///
/// ```rust
/// use synchrony::lazy::{LazyError, LazyRef};
/// use std::sync::Arc;
///
/// let lazy = LazyRef::new(|| Err::<i32, _>("boom"));
/// let first = lazy.get().unwrap_err();
/// let second = lazy.get().unwrap_err();
///
/// match (first, second) {
///     (LazyError::Initialization(first), LazyError::Initialization(second)) => {
///         assert!(Arc::ptr_eq(&first, &second));
///         assert_eq!(*first, "boom");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug)]
pub enum LazyError<E> {
    /// The initializer returned an error.
    Initialization(Arc<E>),
    /// The initializer panicked; carries the panic message.
    Panicked(Arc<str>),
    /// The calling thread was interrupted while waiting for another thread's
    /// computation. The thread's interrupted status is still set.
    Interrupted,
    /// The reference was cancelled.
    Cancelled,
}

impl<E> LazyError<E> {
    /// Returns the initializer's error, if this is an initialization failure.
    pub fn cause(&self) -> Option<&Arc<E>> {
        match self {
            Self::Initialization(cause) => Some(cause),
            _ => None,
        }
    }

    /// Returns whether the initializer failed, either by error or by panic.
    pub const fn is_initialization_failure(&self) -> bool {
        matches!(self, Self::Initialization(_) | Self::Panicked(_))
    }

    /// Returns whether this error reports an interrupted wait.
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Returns whether this error reports a cancelled reference.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl<E> Clone for LazyError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Initialization(cause) => Self::Initialization(Arc::clone(cause)),
            Self::Panicked(message) => Self::Panicked(Arc::clone(message)),
            Self::Interrupted => Self::Interrupted,
            Self::Cancelled => Self::Cancelled,
        }
    }
}

impl<E: fmt::Display> fmt::Display for LazyError<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialization(cause) => write!(formatter, "lazy initialization failed: {cause}"),
            Self::Panicked(message) => {
                write!(formatter, "lazy initializer panicked: {message}")
            }
            Self::Interrupted => {
                formatter.write_str("interrupted while waiting for lazy initialization")
            }
            Self::Cancelled => formatter.write_str("lazy reference has been cancelled"),
        }
    }
}

impl<E: Error + 'static> Error for LazyError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Initialization(cause) => Some(&**cause),
            _ => None,
        }
    }
}
