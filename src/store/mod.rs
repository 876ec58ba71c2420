//! Pluggable key-value storage contract.
//!
//! The index consumes storage through a minimal contract over an ordered,
//! byte-keyed store: point reads and writes, ascending iteration from a seek
//! key, and an all-or-nothing batch. Backends (embedded B-trees, LSM stores,
//! the in-memory store in [`memory`]) implement these traits; the index
//! never assumes anything beyond byte-lexicographic iteration order.

pub mod memory;

use std::fmt::Debug;

use crate::error::Result;

/// An ordered, byte-keyed key-value store.
pub trait KVStore: Send + Sync + Debug {
    /// Get the value stored under a key, or `None` when absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Set the value stored under a key.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete the value stored under a key. Deleting an absent key is not
    /// an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Create an iterator positioned at the first key greater than or equal
    /// to `start`. Iteration visits keys in ascending byte order.
    fn iterator(&self, start: &[u8]) -> Box<dyn KVIterator>;

    /// Create an empty mutation batch. Executing the batch applies all of
    /// its mutations or none of them.
    fn new_batch(&self) -> Box<dyn KVBatch>;

    /// Flush any pending writes to durable storage.
    fn commit(&self) -> Result<()>;
}

/// A forward-only cursor over an ordered key range.
pub trait KVIterator {
    /// Reposition the cursor at the first key greater than or equal to
    /// `key`. Seeking never fails; an out-of-range seek leaves the cursor
    /// invalid.
    fn seek(&mut self, key: &[u8]);

    /// Advance the cursor to the next key.
    fn next(&mut self);

    /// The current key/value pair, or `None` when the cursor is exhausted.
    fn current(&self) -> Option<(&[u8], &[u8])>;
}

/// A staged set of mutations applied atomically.
pub trait KVBatch {
    /// Stage a set.
    fn set(&mut self, key: &[u8], value: &[u8]);

    /// Stage a delete.
    fn delete(&mut self, key: &[u8]);

    /// Apply every staged mutation, all-or-nothing.
    fn execute(&mut self) -> Result<()>;
}
