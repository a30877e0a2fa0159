//! Thread-safe lazy references with exactly-once initialization.
//!
//! - [`LazyRef`]: computes its value at most once, on first demand
//! - [`ResettableLazyRef`]: a lazy reference whose value can be discarded and
//!   recomputed with [`reset`](ResettableLazyRef::reset), or permanently
//!   [`cancel`](ResettableLazyRef::cancel)led
//! - [`LazyError`]: failures reported by both
//!
//! # Guarantees
//!
//! - Under any number of concurrent callers, an initializer runs at most once
//!   per generation. One caller runs it, the others block until it completes.
//! - A value observed by any thread is fully constructed: publication of the
//!   outcome happens-before every read that returns it.
//! - A failed initialization is cached and replayed, never retried. The only
//!   way to retry is [`ResettableLazyRef::reset`] or a new reference.
//! - A thread waiting for someone else's computation can be interrupted
//!   through [`get_interruptibly`](LazyRef::get_interruptibly); the thread
//!   running the initializer cannot.
//!
//! # Examples
//!
//! ```rust
//! use synchrony::lazy::{LazyError, LazyRef};
//!
//! let config = LazyRef::new(|| std::env::var("SYNCHRONY_DOC_EXAMPLE_UNSET"));
//! assert!(matches!(config.get(), Err(LazyError::Initialization(_))));
//! assert!(config.is_failed());
//! ```

mod error;
mod holder;
mod lazy_ref;
mod resettable;

pub use error::LazyError;
pub use lazy_ref::LazyRef;
pub use resettable::ResettableLazyRef;
