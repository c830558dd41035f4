//! The synchronization-strategy ladder.
//!
//! Six sets with the identical [`crate::ConcurrentSet`] contract, ordered by
//! how much parallelism each admits:
//!
//! 1. [`CoarseList`] - one lock around the whole list
//! 2. [`FineList`] - one lock per node, hand-over-hand traversal
//! 3. [`OptimisticList`] - lock-free traversal, lock-and-validate mutation
//! 4. [`LazyList`] - logical deletion marks, O(1) validation, wait-free reads
//! 5. [`LockFreeList`] - no locks anywhere; mark bits and CAS
//! 6. [`LazySkipList`] - the lazy strategy across multiple index levels

mod coarse_list;
mod fine_list;
mod lazy_list;
mod lazy_skip_list;
mod lock_free_list;
mod optimistic_list;

pub use coarse_list::CoarseList;
pub use fine_list::FineList;
pub use lazy_list::LazyList;
pub use lazy_skip_list::LazySkipList;
pub use lock_free_list::LockFreeList;
pub use optimistic_list::OptimisticList;
