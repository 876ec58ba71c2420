//! Point-in-time read handle over the index.

use std::sync::Arc;

use ahash::AHashMap;

use crate::document::{Document, Field, FieldValue, IndexingOptions};
use crate::error::{FalxError, Result};
use crate::index::field_cache::FieldCache;
use crate::index::row::{BackIndexRow, InternalRow, Row, StoredRow, TermFrequencyRow};
use crate::store::{KVIterator, KVStore};
use crate::util::increment_bytes;

/// A read handle capturing the document count at creation time.
///
/// Readers are cheap to create; searchers hold one for the duration of a
/// query so scoring sees a consistent document total.
#[derive(Debug)]
pub struct IndexReader {
    store: Arc<dyn KVStore>,
    field_cache: Arc<FieldCache>,
    doc_count: u64,
}

/// One posting yielded by a [`TermFieldReader`].
#[derive(Debug, Clone, PartialEq)]
pub struct TermFieldDoc {
    /// The external document ID.
    pub id: String,
    /// Occurrences of the term in the field.
    pub freq: u64,
    /// Field-length normalization factor.
    pub norm: f64,
    /// Positional term vectors, when recorded at index time.
    pub vectors: Vec<TermFieldVector>,
}

/// One term occurrence location, with its field resolved back to a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFieldVector {
    /// The field the occurrence appeared in.
    pub field: String,
    /// 1-based token position.
    pub pos: u64,
    /// Byte offset of the start of the occurrence.
    pub start: u64,
    /// Byte offset of the end of the occurrence.
    pub end: u64,
}

/// One term of a field dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    /// The term text.
    pub term: String,
    /// The number of documents containing the term in the field.
    pub count: u64,
}

impl IndexReader {
    pub(crate) fn new(
        store: Arc<dyn KVStore>,
        field_cache: Arc<FieldCache>,
        doc_count: u64,
    ) -> Self {
        IndexReader {
            store,
            field_cache,
            doc_count,
        }
    }

    /// The number of live documents when this reader was created.
    pub fn doc_count(&self) -> u64 {
        self.doc_count
    }

    /// All known field names, ordered by field id.
    pub fn fields(&self) -> Vec<String> {
        self.field_cache.field_names()
    }

    /// Stream the postings of a (term, field) pair in ascending document
    /// ID order.
    ///
    /// An unknown field or absent term yields an empty reader with a count
    /// of zero, never an error.
    pub fn term_field_reader(&self, term: &[u8], field: &str) -> Result<TermFieldReader> {
        let Some(field_index) = self.field_cache.field_named(field) else {
            return Ok(TermFieldReader::empty());
        };
        let prefix = TermFrequencyRow::summary_key(term, field_index);
        let count = match self.store.get(&prefix)? {
            Some(value) => {
                let mut summary = TermFrequencyRow::parse_key(&prefix)?;
                summary.parse_value(&value)?;
                summary.freq
            }
            None => 0,
        };
        let mut iterator = self.store.iterator(&prefix);
        // step over the summary row so the cursor rests on the first posting
        if let Some((key, _)) = iterator.current() {
            if key == prefix.as_slice() {
                iterator.next();
            }
        }
        Ok(TermFieldReader {
            inner: Some(TermFieldReaderInner {
                iterator,
                prefix,
                field_cache: Arc::clone(&self.field_cache),
                started: false,
            }),
            count,
        })
    }

    /// Stream the full term dictionary of a field.
    pub fn field_dict(&self, field: &str) -> Result<FieldDict> {
        self.field_dict_range(field, b"", None)
    }

    /// Stream the term dictionary of a field restricted to terms with a
    /// given prefix.
    pub fn field_dict_prefix(&self, field: &str, prefix: &[u8]) -> Result<FieldDict> {
        let dict = self.field_dict_range(field, prefix, None)?;
        Ok(FieldDict {
            end_exclusive: Some(increment_bytes(prefix)),
            ..dict
        })
    }

    /// Stream the term dictionary of a field restricted to the inclusive
    /// term range `[start, end]`; `None` for `end` leaves it unbounded.
    pub fn field_dict_range(
        &self,
        field: &str,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<FieldDict> {
        let Some(field_index) = self.field_cache.field_named(field) else {
            return Ok(FieldDict {
                iterator: None,
                field: 0,
                end_exclusive: None,
            });
        };
        let mut start_key = Vec::with_capacity(1 + start.len());
        start_key.push(b't');
        start_key.extend_from_slice(start);
        Ok(FieldDict {
            iterator: Some(self.store.iterator(&start_key)),
            field: field_index,
            end_exclusive: end.map(increment_bytes),
        })
    }

    /// Reconstruct a document from its stored rows.
    ///
    /// Only stored fields come back; indexed-only fields are not
    /// recoverable. Returns `None` for a document not in the index.
    pub fn document(&self, id: &str) -> Result<Option<Document>> {
        if self.back_index_row(id)?.is_none() {
            return Ok(None);
        }
        let mut doc = Document::new(id);
        let prefix = StoredRow::scan_prefix_for_doc(id.as_bytes());
        let mut iterator = self.store.iterator(&prefix);
        loop {
            let (key, value) = match iterator.current() {
                Some((key, value)) if key.starts_with(&prefix) => {
                    (key.to_vec(), value.to_vec())
                }
                _ => break,
            };
            let Row::Stored(stored) = Row::parse(&key, &value)? else {
                unreachable!("'s' key parses to a stored row");
            };
            let name = self.field_cache.field_name(stored.field).ok_or_else(|| {
                FalxError::index(format!("stored row references unknown field {}", stored.field))
            })?;
            let value = FieldValue::decode(stored.typ, &stored.value_bytes)?;
            doc.add_field(Field::new(name, value, IndexingOptions::STORED));
            iterator.next();
        }
        Ok(Some(doc))
    }

    /// The indexed terms of a document, grouped by field name.
    ///
    /// Reads the document's back index, so it covers indexed-only fields
    /// that [`document`](IndexReader::document) cannot reconstruct.
    pub fn document_field_terms(&self, id: &str) -> Result<Option<AHashMap<String, Vec<String>>>> {
        let Some(back) = self.back_index_row(id)? else {
            return Ok(None);
        };
        let mut terms: AHashMap<String, Vec<String>> = AHashMap::new();
        for entry in &back.term_entries {
            let name = self.field_cache.field_name(entry.field).ok_or_else(|| {
                FalxError::index(format!("back index references unknown field {}", entry.field))
            })?;
            let term = String::from_utf8(entry.term.clone())
                .map_err(|e| FalxError::row_decode(format!("invalid term bytes: {e}")))?;
            terms.entry(name).or_default().push(term);
        }
        for list in terms.values_mut() {
            list.sort();
        }
        Ok(Some(terms))
    }

    /// Stream all live document IDs in the inclusive range `[start, end]`,
    /// in ascending order. Empty bounds are unbounded.
    pub fn doc_id_reader(&self, start: &str, end: &str) -> DocIdReader {
        let start_key = BackIndexRow::key_for_doc(start.as_bytes());
        DocIdReader {
            iterator: self.store.iterator(&start_key),
            end: end.as_bytes().to_vec(),
        }
    }

    /// Read an internal row set through the index or a batch.
    pub fn get_internal(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(&InternalRow::key_for(key))
    }

    fn back_index_row(&self, id: &str) -> Result<Option<BackIndexRow>> {
        let key = BackIndexRow::key_for_doc(id.as_bytes());
        match self.store.get(&key)? {
            Some(value) => match Row::parse(&key, &value)? {
                Row::BackIndex(back) => Ok(Some(back)),
                _ => unreachable!("'b' key parses to a back index row"),
            },
            None => Ok(None),
        }
    }
}

struct TermFieldReaderInner {
    iterator: Box<dyn KVIterator>,
    prefix: Vec<u8>,
    field_cache: Arc<FieldCache>,
    started: bool,
}

/// A streaming cursor over the postings of one (term, field) pair.
pub struct TermFieldReader {
    inner: Option<TermFieldReaderInner>,
    count: u64,
}

impl TermFieldReader {
    fn empty() -> Self {
        TermFieldReader {
            inner: None,
            count: 0,
        }
    }

    /// The document frequency of the (term, field) pair, from its summary
    /// row.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The next posting in ascending document ID order, or `None` when
    /// exhausted.
    pub fn next(&mut self) -> Result<Option<TermFieldDoc>> {
        let Some(inner) = &mut self.inner else {
            return Ok(None);
        };
        if inner.started {
            inner.iterator.next();
        }
        inner.started = true;
        Self::read_current(inner)
    }

    /// Seek to the first posting whose document ID is greater than or
    /// equal to `id` and return it.
    pub fn advance(&mut self, id: &str) -> Result<Option<TermFieldDoc>> {
        let Some(inner) = &mut self.inner else {
            return Ok(None);
        };
        let mut seek_key = inner.prefix.clone();
        seek_key.extend_from_slice(id.as_bytes());
        inner.iterator.seek(&seek_key);
        inner.started = true;
        Self::read_current(inner)
    }

    fn read_current(inner: &mut TermFieldReaderInner) -> Result<Option<TermFieldDoc>> {
        let (key, value) = match inner.iterator.current() {
            Some((key, value)) if key.starts_with(&inner.prefix) => {
                (key.to_vec(), value.to_vec())
            }
            _ => return Ok(None),
        };
        let mut row = TermFrequencyRow::parse_key(&key)?;
        row.parse_value(&value)?;
        let id = String::from_utf8(row.doc)
            .map_err(|e| FalxError::row_decode(format!("invalid doc id bytes: {e}")))?;
        let mut vectors = Vec::with_capacity(row.vectors.len());
        for vector in row.vectors {
            let field = inner.field_cache.field_name(vector.field).ok_or_else(|| {
                FalxError::index(format!(
                    "term vector references unknown field {}",
                    vector.field
                ))
            })?;
            vectors.push(TermFieldVector {
                field,
                pos: vector.pos,
                start: vector.start,
                end: vector.end,
            });
        }
        Ok(Some(TermFieldDoc {
            id,
            freq: row.freq,
            norm: row.norm as f64,
            vectors,
        }))
    }
}

/// A streaming cursor over one field's term dictionary.
///
/// Yields the (term, field) summary rows for one field in ascending term
/// order, skipping interleaved postings and other fields' entries.
pub struct FieldDict {
    iterator: Option<Box<dyn KVIterator>>,
    field: u16,
    end_exclusive: Option<Vec<u8>>,
}

impl FieldDict {
    /// The next dictionary entry, or `None` when exhausted.
    pub fn next(&mut self) -> Result<Option<DictEntry>> {
        let Some(iterator) = &mut self.iterator else {
            return Ok(None);
        };
        loop {
            let (key, value) = match iterator.current() {
                Some((key, value)) if key.first() == Some(&b't') => {
                    (key.to_vec(), value.to_vec())
                }
                _ => return Ok(None),
            };
            iterator.next();

            let mut row = TermFrequencyRow::parse_key(&key)?;
            // terms ascend, so crossing the bound ends the scan
            if let Some(end) = &self.end_exclusive {
                if row.term.as_slice() >= end.as_slice() {
                    return Ok(None);
                }
            }
            if row.field != self.field || !row.is_summary() {
                continue;
            }
            row.parse_value(&value)?;
            let term = String::from_utf8(row.term)
                .map_err(|e| FalxError::row_decode(format!("invalid term bytes: {e}")))?;
            return Ok(Some(DictEntry {
                term,
                count: row.freq,
            }));
        }
    }
}

/// A streaming cursor over live document IDs, in ascending order.
pub struct DocIdReader {
    iterator: Box<dyn KVIterator>,
    end: Vec<u8>,
}

impl DocIdReader {
    /// The next document ID, or `None` when exhausted.
    pub fn next(&mut self) -> Result<Option<String>> {
        let key = match self.iterator.current() {
            Some((key, _)) if key.first() == Some(&b'b') => key.to_vec(),
            _ => return Ok(None),
        };
        self.iterator.next();
        let doc = &key[1..];
        if !self.end.is_empty() && doc > self.end.as_slice() {
            return Ok(None);
        }
        String::from_utf8(doc.to_vec())
            .map(Some)
            .map_err(|e| FalxError::row_decode(format!("invalid doc id bytes: {e}")))
    }
}
