//! The compute-once engine shared by the lazy reference types.
//!
//! A holder moves through `UNRESOLVED -> RESOLVING -> COMPLETE`, or starts out
//! `CANCELLED` and never leaves it. The transition to `RESOLVING` is a
//! compare-exchange, so exactly one thread runs the initializer. Waiting
//! threads register themselves and park; the completing thread publishes the
//! outcome, then unparks every registered waiter.
//!
//! A holder can additionally be *retired* when it is swapped out of a
//! resettable reference. Retirement wakes waiters that asked to leave on
//! retirement so they can re-read the owning cell; it never disturbs the
//! thread running the initializer.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, Thread};

use parking_lot::Mutex;

use super::LazyError;
use crate::interrupt;

/// State: nobody has asked for the value yet
const STATE_UNRESOLVED: u8 = 0;
/// State: a thread is running the initializer
const STATE_RESOLVING: u8 = 1;
/// State: the outcome is published
const STATE_COMPLETE: u8 = 2;
/// State: terminal, every access fails with `Cancelled`
const STATE_CANCELLED: u8 = 3;

type Outcome<T, E> = Result<T, LazyError<E>>;

/// How a blocked caller reacts to events other than completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WaitPolicy {
    pub(crate) interruptible: bool,
    pub(crate) leave_on_retire: bool,
}

impl WaitPolicy {
    pub(crate) const fn new(interruptible: bool, leave_on_retire: bool) -> Self {
        Self {
            interruptible,
            leave_on_retire,
        }
    }
}

/// Result of a single resolution attempt.
pub(crate) enum Attempt<'a, T, E> {
    Done(Result<&'a T, LazyError<E>>),
    Retired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Ready,
    Interrupted,
    Retired,
}

pub(crate) struct LazyHolder<T, E, F> {
    state: AtomicU8,
    retired: AtomicBool,
    outcome: OnceLock<Outcome<T, E>>,
    initializer: Mutex<Option<F>>,
    waiters: Mutex<Vec<Thread>>,
}

impl<T, E, F> LazyHolder<T, E, F> {
    pub(crate) fn new(initializer: F) -> Self {
        Self {
            state: AtomicU8::new(STATE_UNRESOLVED),
            retired: AtomicBool::new(false),
            outcome: OnceLock::new(),
            initializer: Mutex::new(Some(initializer)),
            waiters: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn resolved(value: T) -> Self {
        Self {
            state: AtomicU8::new(STATE_COMPLETE),
            retired: AtomicBool::new(false),
            outcome: OnceLock::from(Ok(value)),
            initializer: Mutex::new(None),
            waiters: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self {
            state: AtomicU8::new(STATE_CANCELLED),
            retired: AtomicBool::new(false),
            outcome: OnceLock::new(),
            initializer: Mutex::new(None),
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Returns the value without blocking, if it was computed successfully.
    #[inline]
    pub(crate) fn peek(&self) -> Option<&T> {
        self.outcome.get().and_then(|outcome| outcome.as_ref().ok())
    }

    #[inline]
    pub(crate) fn is_resolved(&self) -> bool {
        self.peek().is_some()
    }

    #[inline]
    pub(crate) fn is_failed(&self) -> bool {
        matches!(self.outcome.get(), Some(Err(_)))
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_CANCELLED
    }

    /// Marks the holder as replaced and releases waiters that asked to leave.
    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
        self.wake_all();
    }

    fn wake_all(&self) {
        let waiters = std::mem::take(&mut *self.waiters.lock());
        for waiter in waiters {
            waiter.unpark();
        }
    }

    fn wait(&self, policy: WaitPolicy) -> Wake {
        let current = thread::current();
        let id = current.id();
        self.waiters.lock().push(current);

        // Registration happens before each check, so a completion or
        // retirement that races with us always finds us in the list.
        let wake = loop {
            if self.state.load(Ordering::Acquire) != STATE_RESOLVING {
                break Wake::Ready;
            }
            if policy.leave_on_retire && self.retired.load(Ordering::Acquire) {
                break Wake::Retired;
            }
            if policy.interruptible && interrupt::is_interrupted() {
                break Wake::Interrupted;
            }
            thread::park();
        };

        // A waker drains the list, but a waiter that saw the state change on
        // its own is still registered.
        let mut waiters = self.waiters.lock();
        if let Some(position) = waiters.iter().position(|waiter| waiter.id() == id) {
            waiters.swap_remove(position);
        }
        wake
    }
}

impl<T, E, F> LazyHolder<T, E, F>
where
    F: FnOnce() -> Result<T, E>,
{
    /// Makes one attempt to obtain the outcome, running the initializer if this
    /// caller is the first to arrive.
    pub(crate) fn resolve(&self, policy: WaitPolicy) -> Attempt<'_, T, E> {
        loop {
            if let Some(outcome) = self.outcome.get() {
                return Attempt::Done(outcome.as_ref().map_err(Clone::clone));
            }
            // A replaced holder must not start its initializer for a caller
            // that can move on to the replacement.
            if policy.leave_on_retire && self.retired.load(Ordering::Acquire) {
                return Attempt::Retired;
            }

            match self.state.load(Ordering::Acquire) {
                STATE_UNRESOLVED => {
                    if self
                        .state
                        .compare_exchange_weak(
                            STATE_UNRESOLVED,
                            STATE_RESOLVING,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                    {
                        // Retirement may have landed between the check above
                        // and the claim. Hand the claim back in that case.
                        if policy.leave_on_retire && self.retired.load(Ordering::Acquire) {
                            self.state.store(STATE_UNRESOLVED, Ordering::Release);
                            self.wake_all();
                            return Attempt::Retired;
                        }
                        return Attempt::Done(self.run_initializer());
                    }
                }
                STATE_RESOLVING => match self.wait(policy) {
                    Wake::Ready => {}
                    Wake::Interrupted => {
                        tracing::trace!("wait for lazy initialization interrupted");
                        return Attempt::Done(Err(LazyError::Interrupted));
                    }
                    Wake::Retired => return Attempt::Retired,
                },
                STATE_CANCELLED => return Attempt::Done(Err(LazyError::Cancelled)),
                // STATE_COMPLETE: the outcome was published before the state
                // store, so the next read of `outcome` sees it.
                _ => {}
            }
        }
    }

    /// Resolves without leaving on retirement, blocking until an outcome exists.
    pub(crate) fn force(&self, interruptible: bool) -> Result<&T, LazyError<E>> {
        let policy = WaitPolicy::new(interruptible, false);
        loop {
            if let Attempt::Done(outcome) = self.resolve(policy) {
                return outcome;
            }
        }
    }

    fn run_initializer(&self) -> Result<&T, LazyError<E>> {
        let outcome = self.outcome.get_or_init(|| {
            let initializer = self.initializer.lock().take();
            let Some(initializer) = initializer else {
                return Err(LazyError::Panicked(Arc::from("initializer already consumed")));
            };

            tracing::trace!("running lazy initializer");
            match catch_unwind(AssertUnwindSafe(initializer)) {
                Ok(Ok(value)) => {
                    tracing::trace!("lazy initializer completed");
                    Ok(value)
                }
                Ok(Err(error)) => {
                    tracing::debug!("lazy initializer failed");
                    Err(LazyError::Initialization(Arc::new(error)))
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(message = %message, "lazy initializer panicked");
                    Err(LazyError::Panicked(message))
                }
            }
        });

        self.state.store(STATE_COMPLETE, Ordering::Release);
        self.wake_all();
        outcome.as_ref().map_err(Clone::clone)
    }

    /// Consumes the holder, computing the outcome on this thread if needed.
    pub(crate) fn into_outcome(self) -> Result<T, LazyError<E>> {
        let state = self.state.load(Ordering::Acquire);
        if let Some(outcome) = self.outcome.into_inner() {
            return outcome;
        }
        if state == STATE_CANCELLED {
            return Err(LazyError::Cancelled);
        }
        match self.initializer.into_inner() {
            Some(initializer) => match catch_unwind(AssertUnwindSafe(initializer)) {
                Ok(outcome) => outcome.map_err(|error| LazyError::Initialization(Arc::new(error))),
                Err(payload) => Err(LazyError::Panicked(panic_message(payload.as_ref()))),
            },
            None => Err(LazyError::Panicked(Arc::from("initializer already consumed"))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Arc<str> {
    if let Some(message) = payload.downcast_ref::<&str>() {
        Arc::from(*message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        Arc::from(message.as_str())
    } else {
        Arc::from("non-string panic payload")
    }
}
