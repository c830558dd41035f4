use rstest::rstest;
use strata_core::common_tests::set_core_tests::*;
use strata_core::data_structures::{
    CoarseList, ConcurrentSet, FineList, LazyList, LazySkipList, LockFreeList, OptimisticList,
};
use strata_core::guard::DeferredGuard;

// Trait for type-level parametrization over the strategy ladder
trait TestSet {
    type Set: ConcurrentSet + Default + 'static;
}

// Marker types, one per synchronization strategy
struct UseCoarse;
struct UseFine;
struct UseOptimistic;
struct UseLazy;
struct UseLockFree;
struct UseLazySkipList;

impl TestSet for UseCoarse {
    type Set = CoarseList;
}

impl TestSet for UseFine {
    type Set = FineList;
}

impl TestSet for UseOptimistic {
    type Set = OptimisticList<DeferredGuard>;
}

impl TestSet for UseLazy {
    type Set = LazyList<DeferredGuard>;
}

impl TestSet for UseLockFree {
    type Set = LockFreeList<DeferredGuard>;
}

impl TestSet for UseLazySkipList {
    type Set = LazySkipList<DeferredGuard>;
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
#[case::lazy_skip_list(UseLazySkipList)]
fn test_basic<T: TestSet>(#[case] _strategy: T) {
    let set = T::Set::default();
    test_basic_operations(&set);
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
#[case::lazy_skip_list(UseLazySkipList)]
fn test_scenario<T: TestSet>(#[case] _strategy: T) {
    test_insert_remove_scenario::<T::Set>();
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
#[case::lazy_skip_list(UseLazySkipList)]
fn test_absent<T: TestSet>(#[case] _strategy: T) {
    test_absent_keys::<T::Set>();
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
#[case::lazy_skip_list(UseLazySkipList)]
fn test_clear<T: TestSet>(#[case] _strategy: T) {
    test_clear_resets::<T::Set>();
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
#[case::lazy_skip_list(UseLazySkipList)]
fn test_sorted<T: TestSet>(#[case] _strategy: T) {
    test_scan_is_sorted::<T::Set>();
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
#[case::lazy_skip_list(UseLazySkipList)]
fn test_oracle<T: TestSet>(#[case] _strategy: T) {
    test_sequential_oracle::<T::Set>();
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
#[case::lazy_skip_list(UseLazySkipList)]
fn test_len<T: TestSet>(#[case] _strategy: T) {
    test_len_tracking::<T::Set>();
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
#[case::lazy_skip_list(UseLazySkipList)]
fn test_extremes<T: TestSet>(#[case] _strategy: T) {
    test_extreme_keys::<T::Set>();
}
