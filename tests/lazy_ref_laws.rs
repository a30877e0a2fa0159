#![cfg(feature = "lazy")]
//! Property-based tests for LazyRef and ResettableLazyRef laws.

use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use synchrony::lazy::{LazyError, LazyRef, ResettableLazyRef};

// =============================================================================
// Idempotence and Memoization
// =============================================================================

proptest! {
    /// Every get returns the value of the single computation.
    #[test]
    fn prop_lazy_ref_idempotence(value in any::<String>()) {
        let expected = value.clone();
        let lazy = LazyRef::from_fn(move || value.clone());

        prop_assert_eq!(lazy.get().unwrap(), &expected);
        prop_assert_eq!(lazy.get().unwrap(), &expected);
        prop_assert_eq!(lazy.try_get(), Some(&expected));
    }

    /// The initializer runs at most once however many threads ask.
    #[test]
    fn prop_lazy_ref_memoization_across_threads(value in any::<i64>(), threads in 1_usize..8) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let lazy = Arc::new(LazyRef::from_fn(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            value
        }));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let lazy = Arc::clone(&lazy);
                thread::spawn(move || *lazy.force())
            })
            .collect();
        for handle in handles {
            prop_assert_eq!(handle.join().unwrap(), value);
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// A failed computation reports the same failure on every get.
    #[test]
    fn prop_lazy_ref_failure_is_sticky(message in "[a-z]{1,12}", attempts in 1_usize..6) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let cause = message.clone();
        let lazy: LazyRef<u8, String, _> = LazyRef::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Err(cause.clone())
        });

        for _ in 0..attempts {
            match lazy.get() {
                Err(LazyError::Initialization(error)) => {
                    prop_assert_eq!(&*error, &message);
                }
                other => {
                    prop_assert!(false, "unexpected outcome {:?}", other);
                }
            }
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

// =============================================================================
// Reset Laws
// =============================================================================

proptest! {
    /// Each reset installs exactly one new generation and computes the old one.
    #[test]
    fn prop_resettable_generation_counts_resets(resets in 0_usize..20, reads in 0_usize..4) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let lazy = ResettableLazyRef::from_fn(move || calls_clone.fetch_add(1, Ordering::SeqCst));

        for round in 0..resets {
            for _ in 0..reads {
                prop_assert_eq!(*lazy.get().unwrap(), round);
            }
            prop_assert_eq!(*lazy.reset().unwrap(), round);
        }
        prop_assert_eq!(lazy.generation(), resets as u64);
        prop_assert_eq!(calls.load(Ordering::SeqCst), resets);
    }

    /// Once cancelled, every operation reports cancellation.
    #[test]
    fn prop_resettable_cancel_is_absorbing(resets_before in 0_usize..5, gets_after in 1_usize..5) {
        let lazy = ResettableLazyRef::from_fn(|| 1_u8);
        for _ in 0..resets_before {
            let _ = lazy.reset();
        }
        prop_assert!(lazy.cancel());
        for _ in 0..gets_after {
            prop_assert!(lazy.get().unwrap_err().is_cancelled());
            prop_assert!(lazy.reset().unwrap_err().is_cancelled());
        }
        prop_assert!(!lazy.cancel());
    }
}
