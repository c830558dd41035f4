use std::hint;
use std::ptr;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use crate::data_structures::{ConcurrentSet, Key, debug_assert_user_key};
use crate::guard::Guard;

/// Highest index level; every node has forward links at levels
/// `0..=top_level` with `top_level <= MAX_LEVEL`.
const MAX_LEVEL: usize = 8;

const LEVEL_COUNT: usize = MAX_LEVEL + 1;

type NodePtr = *mut SkipNode;
type LevelArray = [NodePtr; LEVEL_COUNT];

///
/// Lazy synchronization generalized across multiple index levels.
///
/// The single-level lazy list's protocol carries over per level, with two
/// extra visibility rules:
///
/// - A node is present only once `link_finished` is true, and that flag is
///   set strictly after every level's forward link has been installed. A
///   reader that meets the node earlier (a concurrent `add` of the same
///   key) spin-waits for the flag rather than reporting a transient
///   absence, which would admit a second live node for the key.
/// - `marked = true` (sequentially consistent, as in the lazy list) always
///   happens before any physical unlink, so no reader sees a half-removed
///   node as present.
///
/// Lock order: the victim first, then predecessors from level 0 upward.
/// Predecessor keys are non-increasing as the level rises, so every thread
/// acquires node locks in descending key order - a wait cycle would require
/// two distinct nodes with each other's key order inverted, which unique
/// keys rule out.
///
#[derive(Debug)]
struct SkipNode {
    key: Key,
    /// Index of this node's highest forward link.
    top_level: usize,
    /// Set-once logical-deletion flag; never cleared.
    marked: AtomicBool,
    /// Set-once, true only after every level's forward link is installed.
    link_finished: AtomicBool,
    mutex: Mutex<()>,
    next: [AtomicPtr<SkipNode>; LEVEL_COUNT],
}

impl SkipNode {
    fn new(key: Key, top_level: usize) -> NodePtr {
        Box::into_raw(Box::new(SkipNode {
            key,
            top_level,
            marked: AtomicBool::new(false),
            link_finished: AtomicBool::new(false),
            mutex: Mutex::new(()),
            next: std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
        }))
    }

    unsafe fn dealloc_ptr(ptr: NodePtr) {
        unsafe { drop(Box::from_raw(ptr)) };
    }

    #[inline]
    fn get_next(&self, level: usize) -> NodePtr {
        self.next[level].load(Ordering::Acquire)
    }

    #[inline]
    fn set_next(&self, level: usize, ptr: NodePtr) {
        self.next[level].store(ptr, Ordering::Release)
    }
}

pub struct LazySkipList<G: Guard> {
    head: NodePtr,
    tail: NodePtr,
    guard: G,
}

// Safety: mutation is lock-and-validate per level; reads are on atomics.
unsafe impl<G: Guard> Send for LazySkipList<G> {}
unsafe impl<G: Guard> Sync for LazySkipList<G> {}

impl<G: Guard> LazySkipList<G> {
    pub fn new() -> Self {
        let head = SkipNode::new(Key::MIN, MAX_LEVEL);
        let tail = SkipNode::new(Key::MAX, MAX_LEVEL);
        unsafe {
            for level in 0..LEVEL_COUNT {
                (*head).set_next(level, tail);
            }
            // Sentinels are permanently linked and never removed.
            (*head).link_finished.store(true, Ordering::Release);
            (*tail).link_finished.store(true, Ordering::Release);
        }
        LazySkipList {
            head,
            tail,
            guard: G::default(),
        }
    }

    /// Geometric level distribution: keep flipping a fair coin while it
    /// lands on one side, capped at MAX_LEVEL. A single random word and a
    /// trailing-ones count replace the flip loop.
    #[inline]
    fn random_level() -> usize {
        (fastrand::u32(..).trailing_ones() as usize).min(MAX_LEVEL)
    }

    /// Lock-free descent recording the bounding pair at every level.
    ///
    /// Returns the highest level at which a node with `key` was observed
    /// (its top level, when the node is fully linked). Marked nodes are NOT
    /// skipped here: only the remover that set the mark may unlink, and
    /// add/remove/contains each re-check the flags on whatever this finds.
    fn find(&self, key: Key, preds: &mut LevelArray, succs: &mut LevelArray) -> Option<usize> {
        let mut found_level = None;
        let mut pred = self.head;

        for level in (0..LEVEL_COUNT).rev() {
            unsafe {
                let mut curr = (*pred).get_next(level);
                while (*curr).key < key {
                    pred = curr;
                    curr = (*curr).get_next(level);
                }
                if found_level.is_none() && (*curr).key == key {
                    found_level = Some(level);
                }
                preds[level] = pred;
                succs[level] = curr;
            }
        }

        found_level
    }

    fn add_internal(&self, key: Key) -> bool {
        let mut preds: LevelArray = [ptr::null_mut(); LEVEL_COUNT];
        let mut succs: LevelArray = [ptr::null_mut(); LEVEL_COUNT];

        loop {
            if let Some(found_level) = self.find(key, &mut preds, &mut succs) {
                let found = succs[found_level];
                unsafe {
                    if (*found).marked.load(Ordering::SeqCst) {
                        // Mid-removal; retry until it is gone.
                        continue;
                    }
                    // Mid-insertion by another thread: wait for its links to
                    // finish, then report the duplicate. Returning "absent"
                    // here could let a second node for the key go live.
                    while !(*found).link_finished.load(Ordering::Acquire) {
                        hint::spin_loop();
                    }
                    return false;
                }
            }

            let top_level = Self::random_level();

            unsafe {
                // Lock predecessors from level 0 upward; the same node may
                // be the predecessor at several consecutive levels and must
                // only be locked once.
                let mut guards: Vec<MutexGuard<'_, ()>> = Vec::with_capacity(top_level + 1);
                let mut last_locked: NodePtr = ptr::null_mut();
                let mut valid = true;

                for (level, &pred) in preds.iter().enumerate().take(top_level + 1) {
                    if pred != last_locked {
                        guards.push((*pred).mutex.lock().unwrap());
                        last_locked = pred;
                    }
                    valid = !(*pred).marked.load(Ordering::SeqCst)
                        && !(*succs[0]).marked.load(Ordering::SeqCst)
                        && (*pred).get_next(level) == succs[level];
                    if !valid {
                        break;
                    }
                }
                if !valid {
                    continue; // guards drop, full retry
                }

                let node = SkipNode::new(key, top_level);
                for level in 0..=top_level {
                    (*node).set_next(level, succs[level]);
                }
                // Splice bottom-up; the node is reachable from level 0 on.
                for level in 0..=top_level {
                    (*preds[level]).set_next(level, node);
                }
                // Strictly after all splices; readers gate presence on it.
                (*node).link_finished.store(true, Ordering::SeqCst);
                return true;
            }
        }
    }

    fn remove_internal(&self, key: Key) -> bool {
        let mut preds: LevelArray = [ptr::null_mut(); LEVEL_COUNT];
        let mut succs: LevelArray = [ptr::null_mut(); LEVEL_COUNT];

        let Some(found_level) = self.find(key, &mut preds, &mut succs) else {
            return false;
        };
        let victim = succs[found_level];

        unsafe {
            // A node observed below its real top level is still mid-link
            // (or already half-removed); either way it is not a valid
            // target yet.
            if (*victim).marked.load(Ordering::SeqCst)
                || !(*victim).link_finished.load(Ordering::Acquire)
                || (*victim).top_level != found_level
            {
                return false;
            }

            let _victim_guard = (*victim).mutex.lock().unwrap();
            if (*victim).marked.load(Ordering::SeqCst) {
                return false; // another remover won the lock race
            }
            // Logical removal; must be visible before any unlink below.
            (*victim).marked.store(true, Ordering::SeqCst);

            let top_level = (*victim).top_level;
            loop {
                // Lock predecessors bottom-to-top, once per distinct node.
                let mut guards: Vec<MutexGuard<'_, ()>> = Vec::with_capacity(top_level + 1);
                let mut last_locked: NodePtr = ptr::null_mut();
                let mut valid = true;

                for (level, &pred) in preds.iter().enumerate().take(top_level + 1) {
                    if pred != last_locked {
                        guards.push((*pred).mutex.lock().unwrap());
                        last_locked = pred;
                    }
                    valid = !(*pred).marked.load(Ordering::SeqCst)
                        && (*pred).get_next(level) == victim;
                    if !valid {
                        break;
                    }
                }
                if !valid {
                    // The neighborhood changed; the victim is still linked
                    // (only this thread may unlink it), so re-find and retry
                    // the locking phase.
                    drop(guards);
                    let _ = self.find(key, &mut preds, &mut succs);
                    continue;
                }

                // Splice out top-down; level 0 goes last, so the node stays
                // observable (as marked) until fully unlinked above.
                for level in (0..=top_level).rev() {
                    (*preds[level]).set_next(level, (*victim).get_next(level));
                }
                break;
            }
        }

        unsafe {
            self.guard.defer_destroy(victim, SkipNode::dealloc_ptr);
        }
        true
    }

    /// Lock-free; never waits, not even for a mid-link node.
    fn contains_internal(&self, key: Key) -> bool {
        let mut preds: LevelArray = [ptr::null_mut(); LEVEL_COUNT];
        let mut succs: LevelArray = [ptr::null_mut(); LEVEL_COUNT];

        match self.find(key, &mut preds, &mut succs) {
            Some(found_level) => unsafe {
                let found = succs[found_level];
                (*found).link_finished.load(Ordering::Acquire)
                    && !(*found).marked.load(Ordering::SeqCst)
            },
            None => false,
        }
    }
}

impl<G: Guard> ConcurrentSet for LazySkipList<G> {
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
            let mut curr = (*self.head).get_next(0);
            while curr != self.tail {
                let next = (*curr).get_next(0);
                SkipNode::dealloc_ptr(curr);
                curr = next;
            }
            for level in 0..LEVEL_COUNT {
                (*self.head).set_next(level, self.tail);
            }
        }
    }

    fn to_vec(&self) -> Vec<Key> {
        let _pin = G::pin();
        let mut keys = Vec::new();
        unsafe {
            // Level 0 holds every node.
            let mut curr = (*self.head).get_next(0);
            while curr != self.tail {
                if (*curr).link_finished.load(Ordering::Acquire)
                    && !(*curr).marked.load(Ordering::SeqCst)
                {
                    keys.push((*curr).key);
                }
                curr = (*curr).get_next(0);
            }
        }
        keys
    }
}

impl<G: Guard> Default for LazySkipList<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Guard> Drop for LazySkipList<G> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            SkipNode::dealloc_ptr(self.head);
            SkipNode::dealloc_ptr(self.tail);
        }
    }
}
