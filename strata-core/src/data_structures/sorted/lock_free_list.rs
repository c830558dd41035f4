use std::sync::atomic::{AtomicPtr, Ordering};

use crate::data_structures::{ConcurrentSet, Key, MarkedPtr, debug_assert_user_key};
use crate::guard::Guard;

type NodePtr = *mut LockFreeNode;

///
/// Lock-free synchronization in the style of Harris's non-blocking linked
/// list: every `next` field is a single atomically-updated (pointer, mark)
/// pair, and no operation ever takes a lock.
///
/// Removal is two-phase:
///
/// Phase 1, LOGICAL: CAS the mark bit onto the victim's own next field,
/// leaving the pointer unchanged. This is the linearization point; a marked
/// node is absent no matter how long it stays physically linked.
///
/// Phase 2, PHYSICAL: CAS `pred.next` from the victim to its successor.
/// The remover attempts this once; if the CAS loses to a concurrent
/// modification, any later `find` passing the region completes the splice.
///
/// `find` is where the cooperation happens: whenever it sees a marked
/// successor it tries to snip it out, and restarts from the head sentinel
/// when its CAS fails (the predecessor changed underneath it). Every
/// add/remove is thereby an opportunistic unlinker of other threads'
/// logically-removed nodes.
///
/// `contains` never mutates: one bounded read-only walk, wait-free.
///
/// Reclamation: freeing a node right after the unlink CAS would be a
/// use-after-free, because a reader may have fetched the pointer a moment
/// earlier. A removed node is handed to the guard `G` instead, and only
/// after it is known to be fully unlinked - when the remover's own unlink
/// CAS failed, it re-runs `find`, whose postcondition is that no marked
/// node with the key is still reachable.
///
#[derive(Debug)]
struct LockFreeNode {
    key: Key,
    /// Successor pointer with the logical-deletion mark in its LSB.
    /// The mark flags THIS node as removed, not the successor.
    next: AtomicPtr<LockFreeNode>,
}

impl LockFreeNode {
    fn new(key: Key, next: NodePtr) -> NodePtr {
        Box::into_raw(Box::new(LockFreeNode {
            key,
            next: AtomicPtr::new(next),
        }))
    }

    unsafe fn dealloc_ptr(ptr: NodePtr) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

pub struct LockFreeList<G: Guard> {
    head: NodePtr,
    tail: NodePtr,
    guard: G,
}

// Safety: all shared state is behind atomics; reclamation goes through G.
unsafe impl<G: Guard> Send for LockFreeList<G> {}
unsafe impl<G: Guard> Sync for LockFreeList<G> {}

impl<G: Guard> LockFreeList<G> {
    pub fn new() -> Self {
        let tail = LockFreeNode::new(Key::MAX, std::ptr::null_mut());
        let head = LockFreeNode::new(Key::MIN, tail);
        LockFreeList {
            head,
            tail,
            guard: G::default(),
        }
    }

    /// Find the pred/curr pair bounding `key`, snipping out any marked node
    /// encountered on the way.
    ///
    /// Postconditions: `pred.key < key <= curr.key`, `pred.next == curr`
    /// held an instant ago with curr unmarked at that instant, and no
    /// marked node between head and curr is still linked.
    fn find(&self, key: Key) -> (NodePtr, NodePtr) {
        'retry: loop {
            let mut pred = self.head;
            let mut curr = MarkedPtr::unmask(unsafe { (*pred).next.load(Ordering::Acquire) });

            loop {
                let next = MarkedPtr::new(unsafe { (*curr).next.load(Ordering::Acquire) });

                if next.is_marked() {
                    // curr is logically removed - splice it out. A failed
                    // CAS means pred's link changed underneath us; restart
                    // from the head sentinel.
                    let snip = unsafe {
                        (*pred).next.compare_exchange(
                            curr,
                            next.as_ptr(),
                            Ordering::Release,
                            Ordering::Relaxed,
                        )
                    };
                    if snip.is_err() {
                        continue 'retry;
                    }
                    curr = next.as_ptr();
                    continue;
                }

                if unsafe { (*curr).key } >= key {
                    return (pred, curr);
                }
                pred = curr;
                curr = next.as_ptr();
            }
        }
    }

    fn add_internal(&self, key: Key) -> bool {
        let node = LockFreeNode::new(key, std::ptr::null_mut());

        loop {
            let (pred, curr) = self.find(key);
            unsafe {
                if (*curr).key == key {
                    // Never linked; we still own the allocation.
                    LockFreeNode::dealloc_ptr(node);
                    return false;
                }

                (*node).next.store(curr, Ordering::Relaxed);
                // Release publishes the node's fields with the link.
                if (*pred)
                    .next
                    .compare_exchange(curr, node, Ordering::Release, Ordering::Relaxed)
                    .is_ok()
                {
                    return true;
                }
            }
            // CAS failed, retry with a fresh pair.
        }
    }

    fn remove_internal(&self, key: Key) -> bool {
        loop {
            let (pred, curr) = self.find(key);
            unsafe {
                if (*curr).key != key {
                    return false;
                }

                let succ_raw = (*curr).next.load(Ordering::Acquire);
                let succ = MarkedPtr::new(succ_raw);
                if succ.is_marked() {
                    // Another remover won; re-find (which also finishes the
                    // physical unlink) and report accordingly.
                    continue;
                }

                // Phase 1: set the mark, pointer unchanged. SeqCst so that
                // the logical removal is visible to every contains that
                // starts after we return.
                if (*curr)
                    .next
                    .compare_exchange(
                        succ_raw,
                        succ.with_mark(true).as_raw(),
                        Ordering::SeqCst,
                        Ordering::Relaxed,
                    )
                    .is_err()
                {
                    continue;
                }

                // Phase 2: one best-effort unlink; if it loses, find()
                // completes the splice before we hand the node to the guard.
                if (*pred)
                    .next
                    .compare_exchange(curr, succ.as_ptr(), Ordering::Release, Ordering::Relaxed)
                    .is_err()
                {
                    self.find(key);
                }

                self.guard.defer_destroy(curr, LockFreeNode::dealloc_ptr);
                return true;
            }
        }
    }

    /// Wait-free: one bounded read-only walk, no CAS, no retries.
    fn contains_internal(&self, key: Key) -> bool {
        unsafe {
            let mut curr = MarkedPtr::unmask((*self.head).next.load(Ordering::Acquire));
            while (*curr).key < key {
                curr = MarkedPtr::unmask((*curr).next.load(Ordering::Acquire));
            }
            (*curr).key == key
                && !MarkedPtr::new((*curr).next.load(Ordering::SeqCst)).is_marked()
        }
    }
}

impl<G: Guard> ConcurrentSet for LockFreeList<G> {
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
        // Quiescent use only. Reachable nodes are unmarked (a remover always
        // completes the unlink before returning) and were never deferred.
        unsafe {
            let mut curr = MarkedPtr::unmask((*self.head).next.load(Ordering::Acquire));
            while curr != self.tail {
                let next = MarkedPtr::unmask((*curr).next.load(Ordering::Acquire));
                LockFreeNode::dealloc_ptr(curr);
                curr = next;
            }
            (*self.head).next.store(self.tail, Ordering::Release);
        }
    }

    fn to_vec(&self) -> Vec<Key> {
        let _pin = G::pin();
        let mut keys = Vec::new();
        unsafe {
            let mut curr = MarkedPtr::unmask((*self.head).next.load(Ordering::Acquire));
            while curr != self.tail {
                let next = MarkedPtr::new((*curr).next.load(Ordering::Acquire));
                if !next.is_marked() {
                    keys.push((*curr).key);
                }
                curr = next.as_ptr();
            }
        }
        keys
    }
}

impl<G: Guard> Default for LockFreeList<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Guard> Drop for LockFreeList<G> {
    fn drop(&mut self) {
        unsafe {
            let mut curr = MarkedPtr::unmask((*self.head).next.load(Ordering::Acquire));
            while curr != self.tail {
                let next = MarkedPtr::new((*curr).next.load(Ordering::Acquire));
                // A reachable marked node at drop time means a remover
                // returned without completing its unlink.
                debug_assert!(
                    !next.is_marked(),
                    "marked node still physically linked at drop time"
                );
                LockFreeNode::dealloc_ptr(curr);
                curr = next.as_ptr();
            }
            LockFreeNode::dealloc_ptr(self.head);
            LockFreeNode::dealloc_ptr(self.tail);
        }
    }
}
