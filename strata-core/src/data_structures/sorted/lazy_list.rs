use std::ptr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use crate::data_structures::{ConcurrentSet, Key, debug_assert_user_key};
use crate::guard::Guard;

type NodePtr = *mut LazyNode;

///
/// Lazy synchronization: logical deletion marks make validation O(1) and
/// `contains` wait-free.
///
/// Removal is two-phase. `remove` first stores `marked = true` - from that
/// store on the node is logically absent even though still physically
/// reachable - and only then redirects `pred.next`. The mark uses
/// sequentially consistent ordering so that once a removal has returned,
/// every `contains` that starts afterwards observes the mark, regardless of
/// whether the physical unlink has been seen yet.
///
/// `add`/`remove` lock pred/curr exactly as the optimistic list does, but
/// validation no longer re-walks the list:
///
/// ```text
/// !pred.marked && !curr.marked && pred.next == curr
/// ```
///
/// `contains` takes no locks and never retries: walk to the key's position
/// and report present iff the key matches and the node is unmarked.
///
#[derive(Debug)]
struct LazyNode {
    key: Key,
    /// Set-once logical-deletion flag; never cleared.
    marked: AtomicBool,
    mutex: Mutex<()>,
    next: AtomicPtr<LazyNode>,
}

impl LazyNode {
    fn new(key: Key) -> NodePtr {
        Box::into_raw(Box::new(LazyNode {
            key,
            marked: AtomicBool::new(false),
            mutex: Mutex::new(()),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    unsafe fn dealloc_ptr(ptr: NodePtr) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

pub struct LazyList<G: Guard> {
    head: NodePtr,
    tail: NodePtr,
    guard: G,
}

// Safety: mutation is lock-and-validate; reads are on atomics only.
unsafe impl<G: Guard> Send for LazyList<G> {}
unsafe impl<G: Guard> Sync for LazyList<G> {}

impl<G: Guard> LazyList<G> {
    pub fn new() -> Self {
        let head = LazyNode::new(Key::MIN);
        let tail = LazyNode::new(Key::MAX);
        unsafe {
            (*head).next.store(tail, Ordering::Release);
        }
        LazyList {
            head,
            tail,
            guard: G::default(),
        }
    }

    /// Unlocked walk to the first node with key >= `key`.
    fn search(&self, key: Key) -> (NodePtr, NodePtr) {
        unsafe {
            let mut pred = self.head;
            let mut curr = (*pred).next.load(Ordering::Acquire);
            while (*curr).key < key {
                pred = curr;
                curr = (*curr).next.load(Ordering::Acquire);
            }
            (pred, curr)
        }
    }

    /// O(1) validation under both locks: neither node is logically deleted
    /// and they are still adjacent.
    unsafe fn validate(&self, pred: NodePtr, curr: NodePtr) -> bool {
        unsafe {
            !(*pred).marked.load(Ordering::SeqCst)
                && !(*curr).marked.load(Ordering::SeqCst)
                && (*pred).next.load(Ordering::Acquire) == curr
        }
    }

    fn add_internal(&self, key: Key) -> bool {
        loop {
            let (pred, curr) = self.search(key);
            unsafe {
                let _pred_guard = (*pred).mutex.lock().unwrap();
                let _curr_guard = (*curr).mutex.lock().unwrap();

                if !self.validate(pred, curr) {
                    continue;
                }
                if (*curr).key == key {
                    return false;
                }
                let node = LazyNode::new(key);
                (*node).next.store(curr, Ordering::Release);
                (*pred).next.store(node, Ordering::Release);
                return true;
            }
        }
    }

    fn remove_internal(&self, key: Key) -> bool {
        loop {
            let (pred, curr) = self.search(key);
            unsafe {
                {
                    let _pred_guard = (*pred).mutex.lock().unwrap();
                    let _curr_guard = (*curr).mutex.lock().unwrap();

                    if !self.validate(pred, curr) {
                        continue;
                    }
                    if (*curr).key != key {
                        return false;
                    }
                    // Logical removal first; the SeqCst store is the
                    // linearization point and must be visible before the
                    // physical unlink below.
                    (*curr).marked.store(true, Ordering::SeqCst);
                    let succ = (*curr).next.load(Ordering::Acquire);
                    (*pred).next.store(succ, Ordering::Release);
                }
                self.guard.defer_destroy(curr, LazyNode::dealloc_ptr);
                return true;
            }
        }
    }

    /// Wait-free: one bounded walk, no locks, no retries.
    fn contains_internal(&self, key: Key) -> bool {
        unsafe {
            let mut curr = self.head;
            while (*curr).key < key {
                curr = (*curr).next.load(Ordering::Acquire);
            }
            (*curr).key == key && !(*curr).marked.load(Ordering::SeqCst)
        }
    }
}

impl<G: Guard> ConcurrentSet for LazyList<G> {
    fn add(&self, key: Key) -> bool {
        debug_assert_user_key(key);
        let _pin = G::pin();
        self.add_internal(key)
    }

    fn remove(&self, key: Key) -> bool {
        debug_assert_user_key(key);
        let _pin = G::pin();
        self.remove_internal(key)
    }

    fn contains(&self, key: Key) -> bool {
        debug_assert_user_key(key);
        let _pin = G::pin();
        self.contains_internal(key)
    }

    fn clear(&self) {
        // Quiescent use only; reachable nodes were never deferred.
        unsafe {
            let mut curr = (*self.head).next.load(Ordering::Acquire);
            while curr != self.tail {
                let next = (*curr).next.load(Ordering::Acquire);
                LazyNode::dealloc_ptr(curr);
                curr = next;
            }
            (*self.head).next.store(self.tail, Ordering::Release);
        }
    }

    fn to_vec(&self) -> Vec<Key> {
        let _pin = G::pin();
        let mut keys = Vec::new();
        unsafe {
            let mut curr = (*self.head).next.load(Ordering::Acquire);
            while curr != self.tail {
                if !(*curr).marked.load(Ordering::SeqCst) {
                    keys.push((*curr).key);
                }
                curr = (*curr).next.load(Ordering::Acquire);
            }
        }
        keys
    }
}

impl<G: Guard> Default for LazyList<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Guard> Drop for LazyList<G> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            drop(Box::from_raw(self.head));
            drop(Box::from_raw(self.tail));
        }
    }
}
