//! The indexing engine: delta-based document mutation over a KV store.
//!
//! All mutation flows through a single-writer path: documents are analyzed
//! on the worker pool, then each mutation takes the write lock, diffs the
//! analyzed rows against the document's back index, folds the posting-count
//! deltas into the (term, field) summary rows, and applies everything as one
//! atomic store batch.

pub mod analysis;
pub mod field_cache;
pub mod queue;
pub mod reader;
pub mod row;

pub use self::reader::IndexReader;

use std::sync::Arc;

use ahash::AHashMap;
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use parking_lot::Mutex;

use crate::analysis::Analyzer;
use crate::document::Document;
use crate::error::{FalxError, Result};
use crate::index::analysis::AnalysisResult;
use crate::index::field_cache::FieldCache;
use crate::index::queue::AnalysisQueue;
use crate::index::row::{
    BackIndexRow, InternalRow, Row, StoredRow, TermFrequencyRow, VersionRow, INDEX_VERSION,
};
use crate::store::{KVBatch, KVStore};

/// A staged set of document and internal mutations applied as one atomic
/// store batch.
///
/// Operations are keyed by document ID (or internal key); staging a second
/// operation for the same key replaces the first.
#[derive(Debug, Default)]
pub struct Batch {
    index_ops: AHashMap<String, Option<Document>>,
    internal_ops: AHashMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Batch::default()
    }

    /// Stage an index (or re-index) of a document.
    pub fn update(&mut self, doc: Document) {
        self.index_ops.insert(doc.id.clone(), Some(doc));
    }

    /// Stage a document deletion.
    pub fn delete(&mut self, id: &str) {
        self.index_ops.insert(id.to_string(), None);
    }

    /// Stage an internal-row set.
    pub fn set_internal(&mut self, key: &[u8], value: &[u8]) {
        self.internal_ops.insert(key.to_vec(), Some(value.to_vec()));
    }

    /// Stage an internal-row delete.
    pub fn delete_internal(&mut self, key: &[u8]) {
        self.internal_ops.insert(key.to_vec(), None);
    }

    /// The number of staged document operations.
    pub fn len(&self) -> usize {
        self.index_ops.len()
    }

    /// True when no operations are staged.
    pub fn is_empty(&self) -> bool {
        self.index_ops.is_empty() && self.internal_ops.is_empty()
    }
}

/// The index: an inverted index over a pluggable ordered KV store.
#[derive(Debug)]
pub struct Index {
    store: Arc<dyn KVStore>,
    field_cache: Arc<FieldCache>,
    analysis_queue: AnalysisQueue,
    doc_count: Mutex<u64>,
    write_lock: Mutex<()>,
}

impl Index {
    /// Create an index over a store with the given analyzer.
    ///
    /// The index must be [`open`](Index::open)ed before use.
    pub fn new(store: Arc<dyn KVStore>, analyzer: Arc<dyn Analyzer>) -> Self {
        let field_cache = Arc::new(FieldCache::new());
        let analysis_queue =
            AnalysisQueue::new(num_cpus::get(), Arc::clone(&field_cache), analyzer);
        Index {
            store,
            field_cache,
            analysis_queue,
            doc_count: Mutex::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Open the index: initialize a fresh store or validate and warm an
    /// existing one.
    ///
    /// A fresh store gets the version marker written. An existing store
    /// must carry a supported version; the field catalog is loaded into the
    /// cache and the live document count is recovered from the back index.
    pub fn open(&self) -> Result<()> {
        match self.store.get(&VersionRow::key_bytes())? {
            None => {
                let version = VersionRow::current();
                self.store.set(&version.key(), &version.value())?;
                self.store.commit()?;
                debug!("initialized fresh index, version {INDEX_VERSION}");
            }
            Some(value) => {
                let Row::Version(version) = Row::parse(&VersionRow::key_bytes(), &value)? else {
                    unreachable!("version key parses to a version row");
                };
                if version.version != INDEX_VERSION {
                    return Err(FalxError::index(format!(
                        "unsupported index version {} (supported: {})",
                        version.version, INDEX_VERSION
                    )));
                }
                self.warm()?;
            }
        }
        Ok(())
    }

    fn warm(&self) -> Result<()> {
        self.iterate_prefix(b"f", |key, value| {
            let Row::Field(field_row) = Row::parse(key, value)? else {
                unreachable!("'f' key parses to a field row");
            };
            self.field_cache.add_existing(field_row.index, &field_row.name);
            Ok(())
        })?;
        let mut count = 0u64;
        self.iterate_prefix(b"b", |_, _| {
            count += 1;
            Ok(())
        })?;
        *self.doc_count.lock() = count;
        debug!(
            "opened existing index: {count} documents, {} fields",
            self.field_cache.field_names().len()
        );
        Ok(())
    }

    /// Index a document, replacing any previous version of it.
    pub fn update(&self, doc: Document) -> Result<()> {
        let result = self
            .analysis_queue
            .submit(doc)
            .recv()
            .map_err(|_| FalxError::index("analysis worker terminated"))?;

        let _guard = self.write_lock.lock();
        let back = self.back_index_row(result.doc_id.as_bytes())?;
        let is_new = back.is_none();
        let (add_rows, update_rows, delete_rows) = merge_old_and_new(back.as_ref(), result.rows);

        let mut batch = self.store.new_batch();
        self.batch_rows(batch.as_mut(), &add_rows, &update_rows, &delete_rows)?;
        batch.execute()?;
        self.store.commit()?;

        if is_new {
            *self.doc_count.lock() += 1;
        }
        Ok(())
    }

    /// Remove a document and every row it contributed.
    ///
    /// Deleting a document that is not in the index is a no-op.
    pub fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let Some(back) = self.back_index_row(id.as_bytes())? else {
            return Ok(());
        };
        let delete_rows = rows_for_deletion(&back);

        let mut batch = self.store.new_batch();
        self.batch_rows(batch.as_mut(), &[], &[], &delete_rows)?;
        batch.execute()?;
        self.store.commit()?;

        *self.doc_count.lock() -= 1;
        Ok(())
    }

    /// Apply a staged batch of document and internal mutations atomically.
    ///
    /// All documents are analyzed concurrently on the worker pool; the
    /// combined row set, including summary-row adjustments shared across
    /// documents, lands in one store batch.
    pub fn batch(&self, batch: Batch) -> Result<()> {
        let mut deletions: Vec<String> = Vec::new();
        let mut pending: Vec<crossbeam_channel::Receiver<AnalysisResult>> = Vec::new();
        for (id, op) in batch.index_ops {
            match op {
                Some(doc) => pending.push(self.analysis_queue.submit(doc)),
                None => deletions.push(id),
            }
        }
        let mut results: Vec<AnalysisResult> = Vec::with_capacity(pending.len());
        for receiver in pending {
            results.push(
                receiver
                    .recv()
                    .map_err(|_| FalxError::index("analysis worker terminated"))?,
            );
        }

        let _guard = self.write_lock.lock();
        let mut add_rows = Vec::new();
        let mut update_rows = Vec::new();
        let mut delete_rows = Vec::new();
        let mut docs_added = 0u64;
        let mut docs_deleted = 0u64;

        for result in results {
            let back = self.back_index_row(result.doc_id.as_bytes())?;
            if back.is_none() {
                docs_added += 1;
            }
            let (adds, updates, deletes) = merge_old_and_new(back.as_ref(), result.rows);
            add_rows.extend(adds);
            update_rows.extend(updates);
            delete_rows.extend(deletes);
        }
        for id in &deletions {
            if let Some(back) = self.back_index_row(id.as_bytes())? {
                delete_rows.extend(rows_for_deletion(&back));
                docs_deleted += 1;
            }
        }

        let mut kv_batch = self.store.new_batch();
        self.batch_rows(kv_batch.as_mut(), &add_rows, &update_rows, &delete_rows)?;
        for (key, op) in batch.internal_ops {
            let full_key = InternalRow::key_for(&key);
            match op {
                Some(value) => kv_batch.set(&full_key, &value),
                None => kv_batch.delete(&full_key),
            }
        }
        kv_batch.execute()?;
        self.store.commit()?;

        let mut doc_count = self.doc_count.lock();
        *doc_count = *doc_count + docs_added - docs_deleted;
        Ok(())
    }

    /// Stage row mutations into a store batch, folding posting-count deltas
    /// into the (term, field) summary rows.
    ///
    /// Summary bookkeeping is read-modify-write against the current store
    /// state, with deltas accumulated locally first so several documents in
    /// one batch touching the same (term, field) pair fold into a single
    /// summary write.
    fn batch_rows(
        &self,
        batch: &mut dyn KVBatch,
        add_rows: &[Row],
        update_rows: &[Row],
        delete_rows: &[Row],
    ) -> Result<()> {
        let mut summary_deltas: AHashMap<Vec<u8>, i64> = AHashMap::new();

        for row in add_rows {
            batch.set(&row.key(), &row.value());
            if let Row::TermFrequency(tf) = row {
                if !tf.is_summary() {
                    *summary_deltas
                        .entry(TermFrequencyRow::summary_key(&tf.term, tf.field))
                        .or_insert(0) += 1;
                }
            }
        }
        for row in update_rows {
            batch.set(&row.key(), &row.value());
        }
        for row in delete_rows {
            batch.delete(&row.key());
            if let Row::TermFrequency(tf) = row {
                if !tf.is_summary() {
                    *summary_deltas
                        .entry(TermFrequencyRow::summary_key(&tf.term, tf.field))
                        .or_insert(0) -= 1;
                }
            }
        }

        for (summary_key, delta) in summary_deltas {
            if delta == 0 {
                continue;
            }
            let current = match self.store.get(&summary_key)? {
                Some(value) => {
                    let mut summary = TermFrequencyRow::parse_key(&summary_key)?;
                    summary.parse_value(&value)?;
                    summary.freq as i64
                }
                None => 0,
            };
            let next = current + delta;
            if next < 0 {
                return Err(FalxError::index(
                    "posting summary underflow, index is inconsistent",
                ));
            }
            if next == 0 {
                batch.delete(&summary_key);
            } else {
                let mut value = [0u8; 12];
                LittleEndian::write_u64(&mut value[0..8], next as u64);
                batch.set(&summary_key, &value);
            }
        }
        Ok(())
    }

    fn back_index_row(&self, doc: &[u8]) -> Result<Option<BackIndexRow>> {
        let key = BackIndexRow::key_for_doc(doc);
        match self.store.get(&key)? {
            Some(value) => match Row::parse(&key, &value)? {
                Row::BackIndex(back) => Ok(Some(back)),
                _ => unreachable!("'b' key parses to a back index row"),
            },
            None => Ok(None),
        }
    }

    /// The number of live documents.
    pub fn doc_count(&self) -> u64 {
        *self.doc_count.lock()
    }

    /// The total number of rows in the store, version marker included.
    pub fn row_count(&self) -> Result<u64> {
        let mut count = 0u64;
        self.iterate_prefix(b"", |_, _| {
            count += 1;
            Ok(())
        })?;
        Ok(count)
    }

    /// A point-in-time read handle over the index.
    pub fn reader(&self) -> IndexReader {
        IndexReader::new(
            Arc::clone(&self.store),
            Arc::clone(&self.field_cache),
            self.doc_count(),
        )
    }

    /// Set an internal row, outside the indexed document space.
    pub fn set_internal(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.store.set(&InternalRow::key_for(key), value)?;
        self.store.commit()
    }

    /// Delete an internal row.
    pub fn delete_internal(&self, key: &[u8]) -> Result<()> {
        self.store.delete(&InternalRow::key_for(key))?;
        self.store.commit()
    }

    /// Decode every row in the store, in key order. Debugging aid.
    pub fn dump_all(&self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.iterate_prefix(b"", |key, value| {
            rows.push(Row::parse(key, value)?);
            Ok(())
        })?;
        Ok(rows)
    }

    /// Decode the field catalog rows. Debugging aid.
    pub fn dump_fields(&self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.iterate_prefix(b"f", |key, value| {
            rows.push(Row::parse(key, value)?);
            Ok(())
        })?;
        Ok(rows)
    }

    /// Decode every row contributed by one document: its postings (found
    /// through the back index), stored rows, and the back index row itself.
    /// Debugging aid.
    pub fn dump_doc(&self, id: &str) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let Some(back) = self.back_index_row(id.as_bytes())? else {
            return Ok(rows);
        };
        for key in back.all_term_keys() {
            if let Some(value) = self.store.get(&key)? {
                rows.push(Row::parse(&key, &value)?);
            }
        }
        for key in back.all_stored_keys() {
            if let Some(value) = self.store.get(&key)? {
                rows.push(Row::parse(&key, &value)?);
            }
        }
        rows.push(Row::BackIndex(back));
        Ok(rows)
    }

    fn iterate_prefix(
        &self,
        prefix: &[u8],
        mut visit: impl FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        let mut it = self.store.iterator(prefix);
        loop {
            match it.current() {
                Some((key, value)) if key.starts_with(prefix) => visit(key, value)?,
                _ => break,
            }
            it.next();
        }
        Ok(())
    }
}

/// Diff freshly analyzed rows against a document's previous back index.
///
/// Rows whose keys already exist become updates, new keys become adds, and
/// previous postings and stored rows absent from the new analysis become
/// deletes. The back index row itself is an add for a new document and an
/// update otherwise.
fn merge_old_and_new(
    back: Option<&BackIndexRow>,
    rows: Vec<Row>,
) -> (Vec<Row>, Vec<Row>, Vec<Row>) {
    let mut add_rows = Vec::new();
    let mut update_rows = Vec::new();
    let mut delete_rows = Vec::new();

    let Some(back) = back else {
        // brand new document: everything is an add except catalog rows,
        // which are blind idempotent sets
        for row in rows {
            match row {
                Row::Field(_) => update_rows.push(row),
                other => add_rows.push(other),
            }
        }
        return (add_rows, update_rows, delete_rows);
    };

    let mut existing_term_keys: AHashMap<Vec<u8>, ()> = back
        .all_term_keys()
        .into_iter()
        .map(|key| (key, ()))
        .collect();
    let mut existing_stored_keys: AHashMap<Vec<u8>, ()> = back
        .all_stored_keys()
        .into_iter()
        .map(|key| (key, ()))
        .collect();

    for row in rows {
        match &row {
            Row::TermFrequency(tf) => {
                let key = TermFrequencyRow::posting_key(&tf.term, tf.field, &tf.doc);
                if existing_term_keys.remove(&key).is_some() {
                    update_rows.push(row);
                } else {
                    add_rows.push(row);
                }
            }
            Row::Stored(stored) => {
                let key = StoredRow::key_for(&stored.doc, stored.field);
                if existing_stored_keys.remove(&key).is_some() {
                    update_rows.push(row);
                } else {
                    add_rows.push(row);
                }
            }
            Row::Field(_) | Row::BackIndex(_) => update_rows.push(row),
            _ => add_rows.push(row),
        }
    }

    // whatever the old back index still names was not re-emitted: delete it
    for entry in &back.term_entries {
        let key = TermFrequencyRow::posting_key(&entry.term, entry.field, &back.doc);
        if existing_term_keys.contains_key(&key) {
            delete_rows.push(Row::TermFrequency(TermFrequencyRow::new(
                &entry.term,
                entry.field,
                &back.doc,
                0,
                0.0,
            )));
        }
    }
    for &field in &back.stored_entries {
        let key = StoredRow::key_for(&back.doc, field);
        if existing_stored_keys.contains_key(&key) {
            delete_rows.push(Row::Stored(StoredRow::new(&back.doc, field, b'x', b"")));
        }
    }

    (add_rows, update_rows, delete_rows)
}

/// All rows to delete when removing a document: every posting and stored
/// row its back index names, plus the back index row itself.
fn rows_for_deletion(back: &BackIndexRow) -> Vec<Row> {
    let mut rows = Vec::with_capacity(back.term_entries.len() + back.stored_entries.len() + 1);
    for entry in &back.term_entries {
        rows.push(Row::TermFrequency(TermFrequencyRow::new(
            &entry.term,
            entry.field,
            &back.doc,
            0,
            0.0,
        )));
    }
    for &field in &back.stored_entries {
        rows.push(Row::Stored(StoredRow::new(&back.doc, field, b'x', b"")));
    }
    rows.push(Row::BackIndex(back.clone()));
    rows
}
