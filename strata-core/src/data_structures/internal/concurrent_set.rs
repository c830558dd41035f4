/// Key type shared by every set in this crate.
///
/// Keys are totally ordered integers. `Key::MIN` and `Key::MAX` are reserved
/// for the head and tail sentinels; callers may only pass keys strictly
/// between the two.
pub type Key = i64;

#[inline]
pub(crate) fn debug_assert_user_key(key: Key) {
    debug_assert!(
        key > Key::MIN && key < Key::MAX,
        "Key::MIN and Key::MAX are reserved for the sentinels"
    );
}

/// A concurrent set of integer keys.
///
/// Every synchronization strategy in [`crate::data_structures::sorted`]
/// exposes this same contract; they differ only in how much parallelism the
/// implementation admits and which operations can block.
///
/// # Contract
///
/// - [`add`](Self::add) returns `true` iff the key was absent and is now
///   present; inserting a duplicate returns `false` without mutation.
/// - [`remove`](Self::remove) returns `true` iff a present key was removed.
/// - [`contains`](Self::contains) reports current logical membership. Once a
///   `remove` has returned `true`, no `contains` that starts after the
///   removal became visible reports the key present.
/// - [`clear`](Self::clear) resets to the empty state. It is NOT safe
///   against concurrent operations; call it only during quiescent periods.
/// - [`to_vec`](Self::to_vec) is an ordered snapshot for quiescent
///   verification; under concurrent mutation it is a best-effort scan.
///
pub trait ConcurrentSet: Send + Sync {
    /// Insert `key`. Returns `false` if it is already present.
    fn add(&self, key: Key) -> bool;

    /// Remove `key`. Returns `false` if it is absent.
    fn remove(&self, key: Key) -> bool;

    /// Whether `key` is currently (logically) present.
    fn contains(&self, key: Key) -> bool;

    /// Reset to the empty state. Quiescent use only.
    fn clear(&self);

    /// Collect all present keys in ascending order. Quiescent use only.
    fn to_vec(&self) -> Vec<Key>;

    /// Number of present keys. Quiescent use only.
    fn len(&self) -> usize {
        self.to_vec().len()
    }

    /// Whether the set holds no keys. Quiescent use only.
    fn is_empty(&self) -> bool {
        self.to_vec().is_empty()
    }
}
