mod concurrent_set;
mod marked_ptr;

pub use concurrent_set::{ConcurrentSet, Key};
pub(crate) use concurrent_set::debug_assert_user_key;
pub(crate) use marked_ptr::MarkedPtr;
