//! Deferred guard implementation for testing.
//!
//! `DeferredGuard` keeps every node handed to it alive until the guard (and
//! therefore the set that owns it) is dropped. Destruction timing is fully
//! deterministic, which is what the shared test suites want; a long-running
//! process would accumulate memory and should use an epoch guard instead.

#[cfg(debug_assertions)]
use std::collections::HashSet;
use std::sync::Mutex;

use super::Guard;

/// Defers all node destruction until the guard is dropped.
///
/// Nodes are collected from any thread behind a `Mutex` and freed in `Drop`.
///
pub struct DeferredGuard {
    deferred: Mutex<Vec<DeferredNode>>,
    #[cfg(debug_assertions)]
    seen: Mutex<HashSet<usize>>,
}

struct DeferredNode {
    ptr: *mut (),
    dealloc: unsafe fn(*mut ()),
}

// Safety: only the raw pointer and its deallocation function are stored, and
// all access goes through the Mutex.
unsafe impl Send for DeferredNode {}

impl DeferredGuard {
    pub fn new() -> Self {
        DeferredGuard {
            deferred: Mutex::new(Vec::new()),
            #[cfg(debug_assertions)]
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for DeferredGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        let nodes = self.deferred.get_mut().unwrap();
        for node in nodes.drain(..) {
            unsafe {
                (node.dealloc)(node.ptr);
            }
        }
    }
}

impl Guard for DeferredGuard {
    // Protection comes from the stored guard itself, so pinning is a no-op.
    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        #[cfg(debug_assertions)]
        {
            let mut seen = self.seen.lock().unwrap();
            if !seen.insert(node as usize) {
                panic!("node {:#x} deferred twice", node as usize);
            }
        }

        let node = DeferredNode {
            ptr: node as *mut (),
            dealloc: unsafe {
                std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc)
            },
        };
        self.deferred.lock().unwrap().push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferred_guard_frees_on_drop() {
        let guard = DeferredGuard::default();

        for i in 0..10 {
            let ptr = Box::into_raw(Box::new(i));
            unsafe {
                guard.defer_destroy(ptr, |p| {
                    drop(Box::from_raw(p));
                });
            }
        }
        // All 10 nodes freed when guard drops
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "deferred twice")]
    fn test_double_defer_is_detected() {
        let guard = DeferredGuard::default();
        let ptr = Box::into_raw(Box::new(7));

        unsafe {
            guard.defer_destroy(ptr, |p| drop(Box::from_raw(p)));
            guard.defer_destroy(ptr, |p| drop(Box::from_raw(p)));
        }
    }
}
