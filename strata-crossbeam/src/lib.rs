//! Epoch-based memory reclamation for strata-core sets.
//!
//! `strata_core` keeps its reclamation strategy pluggable behind the
//! [`strata_core::Guard`] trait; this crate supplies the production
//! implementation on top of `crossbeam-epoch`.

mod epoch_guard;

pub use epoch_guard::EpochGuard;

use strata_core::{LazyList, LazySkipList, LockFreeList, OptimisticList};

/// Epoch-reclaimed instantiations of the guard-parameterized strategies.
pub type EpochOptimisticList = OptimisticList<EpochGuard>;
pub type EpochLazyList = LazyList<EpochGuard>;
pub type EpochLockFreeList = LockFreeList<EpochGuard>;
pub type EpochLazySkipList = LazySkipList<EpochGuard>;
