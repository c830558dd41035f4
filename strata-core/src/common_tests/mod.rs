//! Shared test suites for ConcurrentSet implementations.
//!
//! Every synchronization strategy exposes the same contract, so the tests
//! are written once, generically, and instantiated per strategy from the
//! integration tests (and from strata-crossbeam for the epoch guard).

pub mod set_core_tests;
