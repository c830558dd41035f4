//! Guard trait for memory reclamation strategies.
//!
//! A set that lets readers traverse without locks cannot free an unlinked
//! node the moment `remove` succeeds: another thread may have loaded a
//! pointer to it an instant earlier. The `Guard` trait is the seam where a
//! set hands such nodes off to a reclamation scheme:
//!
//! ```text
//! LazyList<G: Guard>
//!     ├── LazyList<EpochGuard>      (production, strata-crossbeam)
//!     └── LazyList<DeferredGuard>   (testing, this crate)
//! ```
//!
//! The guard stored in a set schedules deferred destruction; read-side
//! protection is established per operation via [`Guard::pin`].

mod deferred_guard;

pub use deferred_guard::DeferredGuard;

/// A memory reclamation strategy for unlinked nodes.
///
/// # Safety Contract
///
/// Implementations must ensure that a node passed to `defer_destroy` is not
/// freed while any thread that pinned before the call is still pinned.
///
pub trait Guard: Default + Send + Sync {
    /// An active guard protecting reads for its lifetime.
    ///
    /// For epoch-based guards this holds a pinned epoch; for the deferred
    /// guard it is `()` because the set's stored guard already keeps every
    /// deferred node alive.
    ///
    type ReadGuard: Sized;

    /// Enter a read-side critical section.
    ///
    /// Every public set operation pins before touching shared nodes and
    /// stays pinned until it returns.
    ///
    fn pin() -> Self::ReadGuard;

    /// Schedule an unlinked node for destruction once no reader can hold a
    /// reference to it.
    ///
    /// # Safety
    ///
    /// - `node` must have been allocated by the set that owns this guard
    /// - `node` must already be unreachable from the set's sentinels
    /// - `dealloc` must be the matching deallocation function for `node`
    ///
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));
}
