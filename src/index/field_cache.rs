//! In-memory field name/id mapping.

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::index::row::FieldRow;

/// Bidirectional map between field names and their small integer ids.
///
/// Field ids are assigned in order of first appearance and are never reused
/// or removed, so a name's id is stable for the lifetime of the index. The
/// cache is rebuilt from the field catalog rows on open.
#[derive(Debug, Default)]
pub struct FieldCache {
    inner: RwLock<FieldCacheInner>,
}

#[derive(Debug, Default)]
struct FieldCacheInner {
    name_to_index: AHashMap<String, u16>,
    index_to_name: AHashMap<u16, String>,
    last_index: Option<u16>,
}

impl FieldCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        FieldCache::default()
    }

    /// Record a field known to already exist in the catalog.
    pub fn add_existing(&self, index: u16, name: &str) {
        let mut inner = self.inner.write();
        inner.name_to_index.insert(name.to_string(), index);
        inner.index_to_name.insert(index, name.to_string());
        if inner.last_index.is_none_or(|last| index > last) {
            inner.last_index = Some(index);
        }
    }

    /// The id for a field name, assigning the next id when the name is new.
    ///
    /// On a fresh assignment the returned [`FieldRow`] must be persisted to
    /// the catalog as part of the same mutation batch.
    pub fn field_index(&self, name: &str) -> (u16, Option<FieldRow>) {
        let mut inner = self.inner.write();
        if let Some(&index) = inner.name_to_index.get(name) {
            return (index, None);
        }
        let index = match inner.last_index {
            Some(last) => last + 1,
            None => 0,
        };
        inner.name_to_index.insert(name.to_string(), index);
        inner.index_to_name.insert(index, name.to_string());
        inner.last_index = Some(index);
        (index, Some(FieldRow::new(index, name)))
    }

    /// The id for a field name, or `None` when the name is unknown.
    pub fn field_named(&self, name: &str) -> Option<u16> {
        self.inner.read().name_to_index.get(name).copied()
    }

    /// The name for a field id, or `None` when the id is unknown.
    pub fn field_name(&self, index: u16) -> Option<String> {
        self.inner.read().index_to_name.get(&index).cloned()
    }

    /// All known field names, ordered by id.
    pub fn field_names(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut pairs: Vec<(u16, &String)> = inner
            .index_to_name
            .iter()
            .map(|(&index, name)| (index, name))
            .collect();
        pairs.sort_by_key(|&(index, _)| index);
        pairs.into_iter().map(|(_, name)| name.clone()).collect()
    }
}
