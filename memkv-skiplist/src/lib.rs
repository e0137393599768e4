//! Single-writer, multi-reader ordered skip list backed by a bump arena.
//!
//! Readers never lock: nodes are fully built before a release store links
//! them in, and every traversal loads forward pointers with acquire ordering.

mod random;
mod skip_list;

pub mod comparator;
pub mod error;
pub mod mem_allocator;
pub mod options;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
pub use skip_list::{Iter, SkipList, SkipListIter, SkipListReader};

pub mod prelude {
    pub use crate::comparator::prelude::*;
    pub use crate::mem_allocator::prelude::*;
    pub use crate::options::{MAX_HEIGHT_LIMIT, SkipListOptions};
    pub use crate::skip_list::{Iter, SkipList, SkipListIter, SkipListReader};
}
