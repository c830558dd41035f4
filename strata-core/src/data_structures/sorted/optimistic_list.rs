use std::ptr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::data_structures::{ConcurrentSet, Key, debug_assert_user_key};
use crate::guard::Guard;

type NodePtr = *mut OptimisticNode;

///
/// Optimistic synchronization: traverse without locks, then lock and
/// validate.
///
/// The walk takes no locks at all. Once a candidate pred/curr pair is
/// found, the operation locks both (pred first - list order, the same
/// deadlock-avoidance rule as the fine-grained list) and re-walks from the
/// head sentinel to confirm pred is still reachable and still points
/// directly at curr. On validation failure both locks are released and the
/// whole operation retries from scratch.
///
/// Retries are unbounded: a thread can in principle starve while other
/// threads keep reorganizing the region it is examining. That is the
/// documented liveness weakness of the technique, not a bug.
///
/// Because readers traverse with no locks, an unlinked node may still be
/// under a concurrent walk; removed nodes are therefore handed to the guard
/// `G` instead of being freed in place.
///
#[derive(Debug)]
struct OptimisticNode {
    key: Key,
    mutex: Mutex<()>,
    next: AtomicPtr<OptimisticNode>,
}

impl OptimisticNode {
    fn new(key: Key) -> NodePtr {
        Box::into_raw(Box::new(OptimisticNode {
            key,
            mutex: Mutex::new(()),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    unsafe fn dealloc_ptr(ptr: NodePtr) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

pub struct OptimisticList<G: Guard> {
    head: NodePtr,
    tail: NodePtr,
    /// Shared guard instance; removed nodes are deferred here because a
    /// lockless traversal may still be passing through them.
    guard: G,
}

// Safety: mutation is lock-and-validate; reads are on atomic pointers.
unsafe impl<G: Guard> Send for OptimisticList<G> {}
unsafe impl<G: Guard> Sync for OptimisticList<G> {}

impl<G: Guard> OptimisticList<G> {
    pub fn new() -> Self {
        let head = OptimisticNode::new(Key::MIN);
        let tail = OptimisticNode::new(Key::MAX);
        unsafe {
            (*head).next.store(tail, Ordering::Release);
        }
        OptimisticList {
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

    /// Re-walk from the head sentinel while holding both locks: pred must
    /// still be reachable and must still point directly at curr.
    unsafe fn validate(&self, pred: NodePtr, curr: NodePtr) -> bool {
        unsafe {
            let mut node = self.head;
            while (*node).key <= (*pred).key {
                if node == pred {
                    return (*pred).next.load(Ordering::Acquire) == curr;
                }
                node = (*node).next.load(Ordering::Acquire);
            }
            false
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
                let node = OptimisticNode::new(key);
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
                    let succ = (*curr).next.load(Ordering::Acquire);
                    (*pred).next.store(succ, Ordering::Release);
                }
                // Unlinked but possibly still under a concurrent walk.
                self.guard.defer_destroy(curr, OptimisticNode::dealloc_ptr);
                return true;
            }
        }
    }

    fn contains_internal(&self, key: Key) -> bool {
        loop {
            let (pred, curr) = self.search(key);
            unsafe {
                let _pred_guard = (*pred).mutex.lock().unwrap();
                let _curr_guard = (*curr).mutex.lock().unwrap();

                if !self.validate(pred, curr) {
                    continue;
                }
                return (*curr).key == key;
            }
        }
    }
}

impl<G: Guard> ConcurrentSet for OptimisticList<G> {
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
        // Quiescent use only. Interior nodes were never deferred, so freeing
        // them here cannot double-free against the guard.
        unsafe {
            let mut curr = (*self.head).next.load(Ordering::Acquire);
            while curr != self.tail {
                let next = (*curr).next.load(Ordering::Acquire);
                OptimisticNode::dealloc_ptr(curr);
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
                keys.push((*curr).key);
                curr = (*curr).next.load(Ordering::Acquire);
            }
        }
        keys
    }
}

impl<G: Guard> Default for OptimisticList<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Guard> Drop for OptimisticList<G> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            drop(Box::from_raw(self.head));
            drop(Box::from_raw(self.tail));
        }
        // The guard field drops afterwards and reclaims deferred nodes.
    }
}
