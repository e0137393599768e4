//! Memtable built on a lock-free skip list.
//!
//! Writes are encoded as internal keys (user key, sequence number, value
//! type) and inserted into a single-writer skip list. Deletes insert a
//! tombstone; lookups read at a snapshot sequence number without locking.

pub mod comparator;
pub mod error;
pub mod format;
pub mod iterator;
pub mod memtable;
pub mod options;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
pub use memtable::{LookupResult, MemTable, MemTableReader, SharedMemTable};
pub use options::MemTableOptions;
