//! Cooperative thread interruption.
//!
//! Each thread owns an interrupted status. Another thread holding an
//! [`Interrupter`] for it can raise that status, which also unparks the
//! target so that a blocking wait notices promptly. Blocking operations that
//! are documented as interruptible (such as
//! [`LazyRef::get_interruptibly`](crate::lazy::LazyRef::get_interruptibly))
//! give up waiting and report the interruption; the status itself stays set
//! until the thread clears it with [`interrupted`].
//!
//! # Examples
//!
//! ```rust
//! use synchrony::interrupt;
//! use std::sync::mpsc;
//! use std::thread;
//!
//! let (sender, receiver) = mpsc::channel();
//! let worker = thread::spawn(move || {
//!     sender.send(interrupt::current()).unwrap();
//!     while !interrupt::is_interrupted() {
//!         thread::park();
//!     }
//!     interrupt::interrupted()
//! });
//!
//! receiver.recv().unwrap().interrupt();
//! assert!(worker.join().unwrap());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};

struct InterruptState {
    flag: AtomicBool,
    thread: Thread,
}

thread_local! {
    static CURRENT: Arc<InterruptState> = Arc::new(InterruptState {
        flag: AtomicBool::new(false),
        thread: thread::current(),
    });
}

/// A handle that can interrupt one particular thread.
///
/// Obtained on the target thread with [`current`] and then moved to whichever
/// thread needs to interrupt it.
#[derive(Clone)]
pub struct Interrupter {
    state: Arc<InterruptState>,
}

impl Interrupter {
    /// Raises the target thread's interrupted status and wakes it if parked.
    pub fn interrupt(&self) {
        self.state.flag.store(true, Ordering::Release);
        self.state.thread.unpark();
        tracing::trace!(target_thread = ?self.state.thread.id(), "thread interrupted");
    }

    /// Returns whether the target thread's interrupted status is set.
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.state.flag.load(Ordering::Acquire)
    }

    /// Returns the thread this handle interrupts.
    #[inline]
    pub fn thread(&self) -> &Thread {
        &self.state.thread
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Interrupter")
            .field("thread", &self.state.thread.id())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Returns an interruption handle for the calling thread.
pub fn current() -> Interrupter {
    CURRENT.with(|state| Interrupter {
        state: Arc::clone(state),
    })
}

/// Returns whether the calling thread's interrupted status is set.
///
/// The status is left unchanged.
#[inline]
pub fn is_interrupted() -> bool {
    CURRENT.with(|state| state.flag.load(Ordering::Acquire))
}

/// Clears the calling thread's interrupted status, returning its previous value.
#[inline]
pub fn interrupted() -> bool {
    CURRENT.with(|state| state.flag.swap(false, Ordering::AcqRel))
}
