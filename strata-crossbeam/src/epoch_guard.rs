//! Epoch-based guard implementation using crossbeam-epoch.
//!
//! Every public set operation pins the current thread for its duration, so
//! a node deferred here is not freed until all threads pinned at defer time
//! have unpinned - exactly the window during which a lockless traversal
//! could still dereference it.

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};
use strata_core::Guard;

/// Epoch-based memory reclamation guard.
///
/// Zero-sized: all state lives in the global epoch collector, so a set
/// parameterized with `EpochGuard` stays `Send + Sync` and pays nothing
/// per instance. Reclamation is batched and amortized O(1) per node.
///
#[derive(Clone, Copy, Default)]
pub struct EpochGuard;

impl Guard for EpochGuard {
    /// An actual pinned crossbeam guard; dropping it unpins the thread.
    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        // Pin, schedule, unpin: destruction runs once every thread has
        // advanced past the current epoch.
        let guard = epoch::pin();
        unsafe {
            guard.defer_unchecked(move || {
                dealloc(node);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defer_runs_eventually() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        static FREED: AtomicUsize = AtomicUsize::new(0);

        unsafe fn count_free(ptr: *mut u64) {
            FREED.fetch_add(1, Ordering::SeqCst);
            unsafe { drop(Box::from_raw(ptr)) };
        }

        let guard = Arc::new(EpochGuard);
        for _ in 0..1000 {
            let ptr = Box::into_raw(Box::new(0u64));
            unsafe {
                guard.defer_destroy(ptr, count_free);
            }
        }

        // Churn the epoch until the collector has had a chance to run.
        for _ in 0..1000 {
            let pinned = EpochGuard::pin();
            pinned.flush();
        }

        // Not all 1000 are guaranteed collected yet, but the machinery
        // must have freed something by now.
        assert!(FREED.load(Ordering::SeqCst) > 0);
    }
}
