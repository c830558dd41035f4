pub mod common_tests;
pub mod data_structures;
pub mod guard;

// Re-export the types most callers need
pub use data_structures::{
    CoarseList, ConcurrentSet, FineList, Key, LazyList, LazySkipList, LockFreeList,
    OptimisticList,
};
pub use guard::{DeferredGuard, Guard};
