use std::ptr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::data_structures::{ConcurrentSet, Key, debug_assert_user_key};

type NodePtr = *mut FineNode;

///
/// Fine-grained (hand-over-hand) synchronization: every node owns a mutex.
///
/// Traversal locks the head sentinel, then locks each successor before
/// unlocking its predecessor, always in list order. That fixed order is the
/// deadlock-avoidance invariant: two threads walking the same region can
/// never hold each other's next lock.
///
/// When the walk stops, both the predecessor and the current node are held
/// locked, so the operation mutates or inspects under exactly two adjacent
/// locks. `contains` takes locks too - there is no logical-deletion mark at
/// this rung, so an unlocked read could observe a node mid-unlink.
///
/// A removed node can be freed as soon as both locks are released: reaching
/// a node requires locking its predecessor first, and the remover held that
/// lock while redirecting `pred.next`, so no later traversal can arrive at
/// the unlinked node.
///
#[derive(Debug)]
struct FineNode {
    key: Key,
    mutex: Mutex<()>,
    next: AtomicPtr<FineNode>,
}

impl FineNode {
    fn new(key: Key) -> NodePtr {
        Box::into_raw(Box::new(FineNode {
            key,
            mutex: Mutex::new(()),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }
}

pub struct FineList {
    head: NodePtr,
    tail: NodePtr,
}

// Safety: all mutation happens under per-node locks; the sentinels are
// immutable apart from their atomic next pointers.
unsafe impl Send for FineList {}
unsafe impl Sync for FineList {}

impl FineList {
    pub fn new() -> Self {
        let head = FineNode::new(Key::MIN);
        let tail = FineNode::new(Key::MAX);
        unsafe {
            (*head).next.store(tail, Ordering::Release);
        }
        FineList { head, tail }
    }

    /// Hand-over-hand walk to the first node with key >= `key`.
    ///
    /// `f` runs with both pred's and curr's locks held; they are released
    /// when `f` returns. `f` receives raw pointers rather than references so
    /// it can unlink curr without aliasing the locked nodes.
    fn with_locked_pair<R>(&self, key: Key, f: impl FnOnce(NodePtr, NodePtr) -> R) -> R {
        unsafe {
            let mut pred = self.head;
            let mut _pred_guard = (*pred).mutex.lock().unwrap();
            let mut curr = (*pred).next.load(Ordering::Acquire);
            let mut _curr_guard = (*curr).mutex.lock().unwrap();

            while (*curr).key < key {
                // Release pred, keep curr locked, couple onto the successor.
                _pred_guard = _curr_guard;
                pred = curr;
                curr = (*pred).next.load(Ordering::Acquire);
                _curr_guard = (*curr).mutex.lock().unwrap();
            }

            f(pred, curr)
        }
    }
}

impl ConcurrentSet for FineList {
    fn add(&self, key: Key) -> bool {
        debug_assert_user_key(key);
        self.with_locked_pair(key, |pred, curr| unsafe {
            if (*curr).key == key {
                return false;
            }
            let node = FineNode::new(key);
            (*node).next.store(curr, Ordering::Release);
            (*pred).next.store(node, Ordering::Release);
            true
        })
    }

    fn remove(&self, key: Key) -> bool {
        debug_assert_user_key(key);
        let victim = self.with_locked_pair(key, |pred, curr| unsafe {
            if (*curr).key != key {
                return None;
            }
            let succ = (*curr).next.load(Ordering::Acquire);
            (*pred).next.store(succ, Ordering::Release);
            Some(curr)
        });

        match victim {
            // Both locks are released by now; see the type-level comment for
            // why nobody else can still reach the node.
            Some(node) => {
                unsafe { drop(Box::from_raw(node)) };
                true
            }
            None => false,
        }
    }

    fn contains(&self, key: Key) -> bool {
        debug_assert_user_key(key);
        self.with_locked_pair(key, |_pred, curr| unsafe { (*curr).key == key })
    }

    fn clear(&self) {
        // Quiescent use only: walks without locks and frees immediately.
        unsafe {
            let mut curr = (*self.head).next.load(Ordering::Acquire);
            while curr != self.tail {
                let next = (*curr).next.load(Ordering::Acquire);
                drop(Box::from_raw(curr));
                curr = next;
            }
            (*self.head).next.store(self.tail, Ordering::Release);
        }
    }

    fn to_vec(&self) -> Vec<Key> {
        // Coupled walk over the whole list; consistent even mid-churn.
        let mut keys = Vec::new();
        unsafe {
            let mut pred = self.head;
            let mut _pred_guard = (*pred).mutex.lock().unwrap();
            let mut curr = (*pred).next.load(Ordering::Acquire);
            let mut _curr_guard = (*curr).mutex.lock().unwrap();

            while curr != self.tail {
                keys.push((*curr).key);
                _pred_guard = _curr_guard;
                pred = curr;
                curr = (*pred).next.load(Ordering::Acquire);
                _curr_guard = (*curr).mutex.lock().unwrap();
            }
        }
        keys
    }
}

impl Default for FineList {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FineList {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            drop(Box::from_raw(self.head));
            drop(Box::from_raw(self.tail));
        }
    }
}
