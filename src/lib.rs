//! # synchrony
//!
//! Thread-safe building blocks for sharing state between threads without
//! giving up on readability: lazily initialized references with
//! exactly-once semantics, copy-on-write collections with lock-free reads,
//! and compare-and-swap retry helpers.
//!
//! ## Overview
//!
//! - **CAS helpers** ([`cas`]): retry loops over atomics and `ArcSwap` cells
//! - **Lazy references** ([`lazy`]): `LazyRef` computes a value at most once,
//!   `ResettableLazyRef` can additionally be reset or cancelled
//! - **Interruption** ([`interrupt`]): cooperative interruption of threads
//!   blocked in interruptible waits
//! - **Copy-on-write collections** ([`cow`]): maps, sorted maps and sets whose
//!   writers publish modified copies while readers keep going
//!
//! ## Feature Flags
//!
//! - `lazy`: lazy references and interruption (default)
//! - `cow`: copy-on-write collections (default)
//! - `serde`: serialization of the copy-on-write collections' contents
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use synchrony::prelude::*;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let registry = Arc::new(CowMap::new(HashMap::new()));
//! let greeting = Arc::new(LazyRef::from_fn(|| "hello".to_string()));
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|index| {
//!         let registry = Arc::clone(&registry);
//!         let greeting = Arc::clone(&greeting);
//!         thread::spawn(move || {
//!             registry.put(index, format!("{} #{index}", greeting.force()));
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! assert_eq!(registry.len(), 4);
//! assert_eq!(registry.get(&2).as_deref(), Some("hello #2"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use synchrony::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cas::{Backoff, CasCell};

    #[cfg(feature = "lazy")]
    pub use crate::interrupt::Interrupter;

    #[cfg(feature = "lazy")]
    pub use crate::lazy::*;

    #[cfg(feature = "cow")]
    pub use crate::cow::*;
}

pub mod cas;

#[cfg(feature = "lazy")]
pub mod interrupt;

#[cfg(feature = "lazy")]
pub mod lazy;

#[cfg(feature = "cow")]
pub mod cow;
