//! In-memory ordered key-value store.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::store::{KVBatch, KVIterator, KVStore};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// An in-memory [`KVStore`] backed by an ordered map.
///
/// Useful for tests and for ephemeral indexes. Iterators take a read lock
/// per advance rather than holding one, so a cursor may observe writes that
/// land mid-iteration; the index's single-writer mutation path makes this
/// harmless for its own scans.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Arc<RwLock<Map>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// The number of keys currently stored.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// True when the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn iterator(&self, start: &[u8]) -> Box<dyn KVIterator> {
        let mut it = MemoryIterator {
            map: Arc::clone(&self.map),
            current: None,
        };
        it.seek(start);
        Box::new(it)
    }

    fn new_batch(&self) -> Box<dyn KVBatch> {
        Box::new(MemoryBatch {
            map: Arc::clone(&self.map),
            ops: Vec::new(),
        })
    }

    fn commit(&self) -> Result<()> {
        Ok(())
    }
}

struct MemoryIterator {
    map: Arc<RwLock<Map>>,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl KVIterator for MemoryIterator {
    fn seek(&mut self, key: &[u8]) {
        let map = self.map.read();
        self.current = map
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()));
    }

    fn next(&mut self) {
        let Some((curr_key, _)) = &self.current else {
            return;
        };
        let map = self.map.read();
        self.current = map
            .range::<[u8], _>((Bound::Excluded(curr_key.as_slice()), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()));
    }

    fn current(&self) -> Option<(&[u8], &[u8])> {
        self.current
            .as_ref()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

enum BatchOp {
    Set(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

struct MemoryBatch {
    map: Arc<RwLock<Map>>,
    ops: Vec<BatchOp>,
}

impl KVBatch for MemoryBatch {
    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.ops.push(BatchOp::Set(key.to_vec(), value.to_vec()));
    }

    fn delete(&mut self, key: &[u8]) {
        self.ops.push(BatchOp::Delete(key.to_vec()));
    }

    fn execute(&mut self) -> Result<()> {
        // One write lock for the whole batch keeps it all-or-nothing from
        // the perspective of concurrent readers.
        let mut map = self.map.write();
        for op in self.ops.drain(..) {
            match op {
                BatchOp::Set(key, value) => {
                    map.insert(key, value);
                }
                BatchOp::Delete(key) => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get(b"a").unwrap(), None);
        store.set(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        // deleting an absent key is fine
        store.delete(b"a").unwrap();
    }

    #[test]
    fn test_iterator_order_and_seek() {
        let store = MemoryStore::new();
        for key in [b"c".as_slice(), b"a", b"b", b"e"] {
            store.set(key, b"v").unwrap();
        }

        let mut it = store.iterator(b"");
        let mut keys = Vec::new();
        while let Some((k, _)) = it.current() {
            keys.push(k.to_vec());
            it.next();
        }
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"e".to_vec()]);

        // seek to a missing key lands on the next greater key
        it.seek(b"d");
        assert_eq!(it.current().unwrap().0, b"e");
        it.next();
        assert!(it.current().is_none());
        // exhausted cursors stay exhausted
        it.next();
        assert!(it.current().is_none());
    }

    #[test]
    fn test_batch_execute() {
        let store = MemoryStore::new();
        store.set(b"gone", b"x").unwrap();

        let mut batch = store.new_batch();
        batch.set(b"a", b"1");
        batch.set(b"b", b"2");
        batch.delete(b"gone");
        // nothing visible until execute
        assert_eq!(store.get(b"a").unwrap(), None);
        batch.execute().unwrap();

        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.get(b"gone").unwrap(), None);
        store.commit().unwrap();
    }
}
