//! Compare-and-swap retry helpers.
//!
//! Every helper in this module follows the same shape: read the current
//! value, compute a candidate from it, then attempt to install the candidate
//! with a compare-and-set. If another thread changed the cell in the meantime
//! the loop starts over from a fresh read, so the installed value is always
//! derived from a value that was actually current at some point during the call.
//!
//! The cells are abstracted by [`CasCell`], implemented for the standard
//! atomic integers and [`AtomicBool`] (compared by value) and for
//! [`ArcSwap`] / [`ArcSwapOption`] (compared by pointer identity).
//!
//! # Caveat
//!
//! [`update`], [`get_and_update`] and [`get_or_set_if`] loop without a bound
//! and without backoff. They are meant for short, pure transition functions
//! under low contention. For hot counters use [`update_with_backoff`], which
//! has the same observable semantics.
//!
//! # Examples
//!
//! ```rust
//! use synchrony::cas;
//! use std::sync::atomic::AtomicUsize;
//!
//! let counter = AtomicUsize::new(41);
//! let installed = cas::update(&counter, |value| value + 1);
//! assert_eq!(installed, 42);
//!
//! // Only replaces the value when it still equals the expected one.
//! let current = cas::get_or_set_if(&counter, &0, || 100);
//! assert_eq!(current, 42);
//! ```

use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool, AtomicI8, AtomicI16, AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU16,
    AtomicU32, AtomicU64, AtomicUsize, Ordering,
};

use arc_swap::{ArcSwap, ArcSwapOption};

/// An atomic cell that supports compare-and-set.
///
/// `is_same` defines what "unchanged" means for the cell: value equality for
/// plain atomics, pointer identity for reference cells.
pub trait CasCell {
    /// The value held by the cell.
    type Value;

    /// Reads the current value.
    fn load_current(&self) -> Self::Value;

    /// Installs `new` if the cell still holds `current`.
    ///
    /// Returns `true` when the value was installed.
    fn compare_and_set(&self, current: &Self::Value, new: Self::Value) -> bool;

    /// Returns whether two values are the same for the purpose of this cell.
    fn is_same(left: &Self::Value, right: &Self::Value) -> bool;
}

macro_rules! impl_cas_cell_for_atomic {
    ($($atomic:ty => $value:ty),* $(,)?) => {
        $(
            impl CasCell for $atomic {
                type Value = $value;

                #[inline]
                fn load_current(&self) -> $value {
                    self.load(Ordering::Acquire)
                }

                #[inline]
                fn compare_and_set(&self, current: &$value, new: $value) -> bool {
                    self.compare_exchange(*current, new, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                }

                #[inline]
                fn is_same(left: &$value, right: &$value) -> bool {
                    left == right
                }
            }
        )*
    };
}

impl_cas_cell_for_atomic! {
    AtomicBool => bool,
    AtomicU8 => u8,
    AtomicU16 => u16,
    AtomicU32 => u32,
    AtomicU64 => u64,
    AtomicUsize => usize,
    AtomicI8 => i8,
    AtomicI16 => i16,
    AtomicI32 => i32,
    AtomicI64 => i64,
    AtomicIsize => isize,
}

impl<T> CasCell for ArcSwap<T> {
    type Value = Arc<T>;

    #[inline]
    fn load_current(&self) -> Arc<T> {
        self.load_full()
    }

    fn compare_and_set(&self, current: &Arc<T>, new: Arc<T>) -> bool {
        let previous = self.compare_and_swap(current, new);
        Arc::ptr_eq(&*previous, current)
    }

    #[inline]
    fn is_same(left: &Arc<T>, right: &Arc<T>) -> bool {
        Arc::ptr_eq(left, right)
    }
}

impl<T> CasCell for ArcSwapOption<T> {
    type Value = Option<Arc<T>>;

    #[inline]
    fn load_current(&self) -> Option<Arc<T>> {
        self.load_full()
    }

    fn compare_and_set(&self, current: &Option<Arc<T>>, new: Option<Arc<T>>) -> bool {
        let previous = self.compare_and_swap(current, new);
        Self::is_same(&*previous, current)
    }

    fn is_same(left: &Option<Arc<T>>, right: &Option<Arc<T>>) -> bool {
        match (left, right) {
            (Some(left), Some(right)) => Arc::ptr_eq(left, right),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Applies `function` to the cell until a compare-and-set succeeds.
///
/// Returns the value that was installed.
///
/// # Examples
///
/// ```rust
/// use synchrony::cas;
/// use std::sync::atomic::AtomicI64;
///
/// let cell = AtomicI64::new(10);
/// assert_eq!(cas::update(&cell, |value| value * 2), 20);
/// ```
pub fn update<C, F>(cell: &C, mut function: F) -> C::Value
where
    C: CasCell + ?Sized,
    C::Value: Clone,
    F: FnMut(&C::Value) -> C::Value,
{
    loop {
        let current = cell.load_current();
        let candidate = function(&current);
        if cell.compare_and_set(&current, candidate.clone()) {
            return candidate;
        }
    }
}

/// Applies `function` to the cell until a compare-and-set succeeds.
///
/// Returns the value that was replaced.
///
/// # Examples
///
/// ```rust
/// use synchrony::cas;
/// use std::sync::atomic::AtomicU32;
///
/// let cell = AtomicU32::new(1);
/// assert_eq!(cas::get_and_update(&cell, |value| value + 1), 1);
/// assert_eq!(cas::update(&cell, |value| *value), 2);
/// ```
pub fn get_and_update<C, F>(cell: &C, mut function: F) -> C::Value
where
    C: CasCell + ?Sized,
    F: FnMut(&C::Value) -> C::Value,
{
    loop {
        let current = cell.load_current();
        let candidate = function(&current);
        if cell.compare_and_set(&current, candidate) {
            return current;
        }
    }
}

/// Installs a supplied value only while the cell holds `expected`.
///
/// If the current value is not `expected`, it is returned untouched. Otherwise
/// `supplier` is invoked (possibly more than once under contention) and the
/// result installed, looping until either the compare-and-set succeeds or the
/// cell moves away from `expected`. Returns the value held afterwards.
///
/// # Examples
///
/// ```rust
/// use synchrony::cas;
/// use arc_swap::ArcSwapOption;
/// use std::sync::Arc;
///
/// let cell: ArcSwapOption<String> = ArcSwapOption::empty();
/// let installed = cas::get_or_set_if(&cell, &None, || Some(Arc::new("first".to_string())));
/// let second = cas::get_or_set_if(&cell, &None, || Some(Arc::new("second".to_string())));
/// assert_eq!(installed.as_deref().map(String::as_str), Some("first"));
/// assert_eq!(second.as_deref().map(String::as_str), Some("first"));
/// ```
pub fn get_or_set_if<C, S>(cell: &C, expected: &C::Value, mut supplier: S) -> C::Value
where
    C: CasCell + ?Sized,
    C::Value: Clone,
    S: FnMut() -> C::Value,
{
    loop {
        let current = cell.load_current();
        if !C::is_same(&current, expected) {
            return current;
        }
        let candidate = supplier();
        if C::is_same(&candidate, &current) {
            return current;
        }
        if cell.compare_and_set(&current, candidate.clone()) {
            return candidate;
        }
    }
}

/// Spin/yield policy used by [`update_with_backoff`].
///
/// After the `n`-th failed compare-and-set the caller spins
/// `2^min(n, max_spin_shift)` times, and starts yielding to the scheduler once
/// `n` exceeds `yield_after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Upper bound on the exponent of the spin count.
    pub max_spin_shift: u32,
    /// Number of failed attempts after which the thread also yields.
    pub yield_after: u32,
}

impl Backoff {
    /// Creates a backoff policy.
    #[inline]
    pub const fn new(max_spin_shift: u32, yield_after: u32) -> Self {
        Self {
            max_spin_shift,
            yield_after,
        }
    }

    fn pause(&self, attempt: u32) {
        let iterations = 1u32 << attempt.min(self.max_spin_shift).min(31);
        for _ in 0..iterations {
            std::hint::spin_loop();
        }
        if attempt > self.yield_after {
            if attempt == self.yield_after + 1 {
                tracing::trace!(attempt, "compare-and-set contended, yielding between attempts");
            }
            std::thread::yield_now();
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(6, 10)
    }
}

/// Like [`update`], pausing according to `backoff` after each failed attempt.
///
/// # Examples
///
/// ```rust
/// use synchrony::cas::{self, Backoff};
/// use std::sync::atomic::AtomicUsize;
///
/// let cell = AtomicUsize::new(0);
/// assert_eq!(cas::update_with_backoff(&cell, |value| value + 5, &Backoff::default()), 5);
/// ```
pub fn update_with_backoff<C, F>(cell: &C, mut function: F, backoff: &Backoff) -> C::Value
where
    C: CasCell + ?Sized,
    C::Value: Clone,
    F: FnMut(&C::Value) -> C::Value,
{
    let mut attempt = 0u32;
    loop {
        let current = cell.load_current();
        let candidate = function(&current);
        if cell.compare_and_set(&current, candidate.clone()) {
            return candidate;
        }
        backoff.pause(attempt);
        attempt = attempt.saturating_add(1);
    }
}
