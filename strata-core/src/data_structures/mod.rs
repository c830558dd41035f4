//! Concurrent sorted-set implementations.
//!
//! # Organization
//!
//! - [`sorted`] - The synchronization-strategy ladder, from a single global
//!   lock up to a lock-free list and a lazy skip list
//! - [`internal`] - Shared implementation details (pub(crate))

pub(crate) mod internal;
pub mod sorted;

// Re-exports for convenience
pub use internal::{ConcurrentSet, Key};
pub use sorted::{CoarseList, FineList, LazyList, LazySkipList, LockFreeList, OptimisticList};

pub(crate) use internal::MarkedPtr;
pub(crate) use internal::debug_assert_user_key;
