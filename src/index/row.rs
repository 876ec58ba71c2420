//! On-disk row encodings for the inverted index.
//!
//! Every row has a deterministic key and value encoding. Rows are
//! discriminated by a one-byte type tag as the first key byte, so typed
//! prefix iteration over the ordered store visits one row family at a time:
//!
//! - `v` — version marker (singleton)
//! - `f` — field catalog entry
//! - `t` — term frequency posting (or its (term, field) summary row)
//! - `b` — back index entry, one per live document
//! - `s` — stored field value
//! - `i` — opaque internal storage for adapters
//!
//! Fixed-width integers are little-endian; variable-length components are
//! delimited by [`BYTE_SEPARATOR`]. Term bytes and document IDs must never
//! contain the separator byte — document IDs are UTF-8 strings, which never
//! produce `0xff`, and analyzers are required to guarantee the same for
//! terms.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FalxError, Result};

/// Delimiter for variable-length key and value components.
///
/// `0xff` sorts after every UTF-8 byte, so natural byte-order iteration
/// matches the intended lexicographic ordering.
pub const BYTE_SEPARATOR: u8 = 0xff;

/// On-disk format version written by this crate.
pub const INDEX_VERSION: u8 = 1;

/// A decoded index row.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// The singleton version marker.
    Version(VersionRow),
    /// A field catalog entry.
    Field(FieldRow),
    /// A term frequency posting or summary.
    TermFrequency(TermFrequencyRow),
    /// A back index entry.
    BackIndex(BackIndexRow),
    /// A stored field value.
    Stored(StoredRow),
    /// Opaque internal storage.
    Internal(InternalRow),
}

impl Row {
    /// Encode this row's key.
    pub fn key(&self) -> Vec<u8> {
        match self {
            Row::Version(r) => r.key(),
            Row::Field(r) => r.key(),
            Row::TermFrequency(r) => r.key(),
            Row::BackIndex(r) => r.key(),
            Row::Stored(r) => r.key(),
            Row::Internal(r) => r.key(),
        }
    }

    /// Encode this row's value.
    pub fn value(&self) -> Vec<u8> {
        match self {
            Row::Version(r) => r.value(),
            Row::Field(r) => r.value(),
            Row::TermFrequency(r) => r.value(),
            Row::BackIndex(r) => r.value(),
            Row::Stored(r) => r.value(),
            Row::Internal(r) => r.value(),
        }
    }

    /// Decode a row from a raw key/value pair, dispatching on the type tag.
    ///
    /// Fails on an empty key, an unrecognized type tag, or a structurally
    /// truncated key or value.
    pub fn parse(key: &[u8], value: &[u8]) -> Result<Row> {
        match key.first() {
            None => Err(FalxError::row_decode("empty row key")),
            Some(b'v') => Ok(Row::Version(VersionRow::parse(key, value)?)),
            Some(b'f') => Ok(Row::Field(FieldRow::parse(key, value)?)),
            Some(b't') => Ok(Row::TermFrequency(TermFrequencyRow::parse(key, value)?)),
            Some(b'b') => Ok(Row::BackIndex(BackIndexRow::parse(key, value)?)),
            Some(b's') => Ok(Row::Stored(StoredRow::parse(key, value)?)),
            Some(b'i') => Ok(Row::Internal(InternalRow::parse(key, value)?)),
            Some(other) => Err(FalxError::row_decode(format!(
                "unknown row type tag '{}'",
                *other as char
            ))),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Row::Version(r) => write!(f, "Version: {}", r.version),
            Row::Field(r) => write!(f, "Field: {} Name: {}", r.index, r.name),
            Row::TermFrequency(r) => write!(
                f,
                "Term: `{}` Field: {} DocID: `{}` Frequency: {} Norm: {} Vectors: {}",
                String::from_utf8_lossy(&r.term),
                r.field,
                String::from_utf8_lossy(&r.doc),
                r.freq,
                r.norm,
                r.vectors.len()
            ),
            Row::BackIndex(r) => write!(
                f,
                "BackIndex DocID: `{}` Term Entries: {} Stored Entries: {}",
                String::from_utf8_lossy(&r.doc),
                r.term_entries.len(),
                r.stored_entries.len()
            ),
            Row::Stored(r) => write!(
                f,
                "Stored DocID: `{}` Field: {} Type: '{}'",
                String::from_utf8_lossy(&r.doc),
                r.field,
                r.typ as char
            ),
            Row::Internal(r) => write!(
                f,
                "Internal Key: `{}`",
                String::from_utf8_lossy(&r.key_bytes)
            ),
        }
    }
}

/// The singleton version marker row, key `{'v'}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRow {
    /// On-disk format version.
    pub version: u8,
}

impl VersionRow {
    /// Create a version row for the current format version.
    pub fn current() -> Self {
        VersionRow {
            version: INDEX_VERSION,
        }
    }

    /// The singleton version key.
    pub fn key_bytes() -> Vec<u8> {
        vec![b'v']
    }

    pub fn key(&self) -> Vec<u8> {
        Self::key_bytes()
    }

    pub fn value(&self) -> Vec<u8> {
        vec![self.version]
    }

    fn parse(_key: &[u8], value: &[u8]) -> Result<VersionRow> {
        match value {
            [version] => Ok(VersionRow { version: *version }),
            _ => Err(FalxError::row_decode("version row value must be one byte")),
        }
    }
}

/// A field catalog row, key `{'f', fieldID:u16-LE}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    /// The small integer field id.
    pub index: u16,
    /// The field name.
    pub name: String,
}

impl FieldRow {
    /// Create a new field row.
    pub fn new<S: Into<String>>(index: u16, name: S) -> Self {
        FieldRow {
            index,
            name: name.into(),
        }
    }

    /// The common prefix of every field row key.
    pub fn scan_prefix() -> Vec<u8> {
        vec![b'f']
    }

    pub fn key(&self) -> Vec<u8> {
        let mut buf = vec![b'f', 0, 0];
        LittleEndian::write_u16(&mut buf[1..3], self.index);
        buf
    }

    pub fn value(&self) -> Vec<u8> {
        let mut buf = self.name.as_bytes().to_vec();
        buf.push(BYTE_SEPARATOR);
        buf
    }

    fn parse(key: &[u8], value: &[u8]) -> Result<FieldRow> {
        if key.len() != 3 {
            return Err(FalxError::row_decode("field row key must be 3 bytes"));
        }
        let index = LittleEndian::read_u16(&key[1..3]);
        match value.split_last() {
            Some((&BYTE_SEPARATOR, name)) => {
                let name = std::str::from_utf8(name)
                    .map_err(|e| FalxError::row_decode(format!("invalid field name: {e}")))?;
                Ok(FieldRow::new(index, name))
            }
            _ => Err(FalxError::row_decode(
                "field row value missing trailing separator",
            )),
        }
    }
}

/// One positional term-vector entry of a posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermVector {
    /// Field id the occurrence belongs to (composite fields propagate
    /// occurrences from their constituent fields).
    pub field: u16,
    /// 1-based token position.
    pub pos: u64,
    /// Byte offset of the start of the occurrence.
    pub start: u64,
    /// Byte offset of the end of the occurrence.
    pub end: u64,
}

const TERM_VECTOR_LEN: usize = 2 + 8 + 8 + 8;

/// A (term, field, document) posting row, key `{'t', term, sep,
/// fieldID:u16-LE, docID}`.
///
/// A row with an empty `doc` is the summary row for its (term, field) pair:
/// its `freq` holds the aggregate document frequency read to compute IDF.
#[derive(Debug, Clone, PartialEq)]
pub struct TermFrequencyRow {
    /// The term bytes.
    pub term: Vec<u8>,
    /// The field id.
    pub field: u16,
    /// The document ID bytes; empty for the summary row.
    pub doc: Vec<u8>,
    /// Occurrence count (document frequency for summary rows).
    pub freq: u64,
    /// Field-length normalization factor.
    pub norm: f32,
    /// Optional positional term vectors.
    pub vectors: Vec<TermVector>,
}

impl TermFrequencyRow {
    /// Create a posting row without term vectors.
    pub fn new(term: &[u8], field: u16, doc: &[u8], freq: u64, norm: f32) -> Self {
        TermFrequencyRow {
            term: term.to_vec(),
            field,
            doc: doc.to_vec(),
            freq,
            norm,
            vectors: Vec::new(),
        }
    }

    /// Create a posting row with term vectors.
    pub fn with_vectors(
        term: &[u8],
        field: u16,
        doc: &[u8],
        freq: u64,
        norm: f32,
        vectors: Vec<TermVector>,
    ) -> Self {
        TermFrequencyRow {
            term: term.to_vec(),
            field,
            doc: doc.to_vec(),
            freq,
            norm,
            vectors,
        }
    }

    /// Create a summary row for a (term, field) pair.
    pub fn summary(term: &[u8], field: u16, count: u64) -> Self {
        TermFrequencyRow::new(term, field, b"", count, 0.0)
    }

    /// True when this is the (term, field) summary row.
    pub fn is_summary(&self) -> bool {
        self.doc.is_empty()
    }

    /// The key of a posting for the given coordinates.
    pub fn posting_key(term: &[u8], field: u16, doc: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + term.len() + 1 + 2 + doc.len());
        buf.push(b't');
        buf.extend_from_slice(term);
        buf.push(BYTE_SEPARATOR);
        let mut field_buf = [0u8; 2];
        LittleEndian::write_u16(&mut field_buf, field);
        buf.extend_from_slice(&field_buf);
        buf.extend_from_slice(doc);
        buf
    }

    /// The summary-row key for a (term, field) pair; also the common prefix
    /// of every posting for that pair.
    pub fn summary_key(term: &[u8], field: u16) -> Vec<u8> {
        Self::posting_key(term, field, b"")
    }

    pub fn key(&self) -> Vec<u8> {
        Self::posting_key(&self.term, self.field, &self.doc)
    }

    pub fn value(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 8 + 4 + self.vectors.len() * TERM_VECTOR_LEN];
        LittleEndian::write_u64(&mut buf[0..8], self.freq);
        LittleEndian::write_f32(&mut buf[8..12], self.norm);
        let mut offset = 12;
        for vector in &self.vectors {
            LittleEndian::write_u16(&mut buf[offset..offset + 2], vector.field);
            LittleEndian::write_u64(&mut buf[offset + 2..offset + 10], vector.pos);
            LittleEndian::write_u64(&mut buf[offset + 10..offset + 18], vector.start);
            LittleEndian::write_u64(&mut buf[offset + 18..offset + 26], vector.end);
            offset += TERM_VECTOR_LEN;
        }
        buf
    }

    /// Decode just the key of a posting row.
    pub fn parse_key(key: &[u8]) -> Result<TermFrequencyRow> {
        if key.is_empty() {
            return Err(FalxError::row_decode("empty row key"));
        }
        let body = &key[1..];
        let sep = body
            .iter()
            .position(|&b| b == BYTE_SEPARATOR)
            .ok_or_else(|| FalxError::row_decode("term frequency key missing separator"))?;
        let rest = &body[sep + 1..];
        if rest.len() < 2 {
            return Err(FalxError::row_decode(
                "term frequency key truncated before field id",
            ));
        }
        Ok(TermFrequencyRow::new(
            &body[..sep],
            LittleEndian::read_u16(&rest[0..2]),
            &rest[2..],
            0,
            0.0,
        ))
    }

    fn parse(key: &[u8], value: &[u8]) -> Result<TermFrequencyRow> {
        let mut row = Self::parse_key(key)?;
        row.parse_value(value)?;
        Ok(row)
    }

    /// Decode a posting value into this row.
    pub fn parse_value(&mut self, value: &[u8]) -> Result<()> {
        if value.len() < 12 {
            return Err(FalxError::row_decode(
                "term frequency value shorter than freq+norm",
            ));
        }
        if (value.len() - 12) % TERM_VECTOR_LEN != 0 {
            return Err(FalxError::row_decode(
                "term frequency value has truncated term vectors",
            ));
        }
        self.freq = LittleEndian::read_u64(&value[0..8]);
        self.norm = LittleEndian::read_f32(&value[8..12]);
        self.vectors = value[12..]
            .chunks_exact(TERM_VECTOR_LEN)
            .map(|chunk| TermVector {
                field: LittleEndian::read_u16(&chunk[0..2]),
                pos: LittleEndian::read_u64(&chunk[2..10]),
                start: LittleEndian::read_u64(&chunk[10..18]),
                end: LittleEndian::read_u64(&chunk[18..26]),
            })
            .collect();
        Ok(())
    }
}

/// One (term, field) posting recorded in a document's back index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackIndexTermEntry {
    /// The term bytes.
    pub term: Vec<u8>,
    /// The field id.
    pub field: u16,
}

/// The per-document ledger row, key `{'b', docID}`.
///
/// Records exactly which (term, field) postings and which stored fields
/// currently exist for the document — the authoritative list of what must
/// be deleted on the next update or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackIndexRow {
    /// The document ID bytes.
    pub doc: Vec<u8>,
    /// All (term, field) postings of the document.
    pub term_entries: Vec<BackIndexTermEntry>,
    /// Field ids of all stored fields of the document.
    pub stored_entries: Vec<u16>,
}

impl BackIndexRow {
    /// Create a new back index row.
    pub fn new(doc: &[u8], term_entries: Vec<BackIndexTermEntry>, stored_entries: Vec<u16>) -> Self {
        BackIndexRow {
            doc: doc.to_vec(),
            term_entries,
            stored_entries,
        }
    }

    /// The back index key for a document ID.
    pub fn key_for_doc(doc: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + doc.len());
        buf.push(b'b');
        buf.extend_from_slice(doc);
        buf
    }

    /// Keys of every posting row named by this back index.
    pub fn all_term_keys(&self) -> Vec<Vec<u8>> {
        self.term_entries
            .iter()
            .map(|e| TermFrequencyRow::posting_key(&e.term, e.field, &self.doc))
            .collect()
    }

    /// Keys of every stored row named by this back index.
    pub fn all_stored_keys(&self) -> Vec<Vec<u8>> {
        self.stored_entries
            .iter()
            .map(|&field| StoredRow::key_for(&self.doc, field))
            .collect()
    }

    pub fn key(&self) -> Vec<u8> {
        Self::key_for_doc(&self.doc)
    }

    pub fn value(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 4];
        LittleEndian::write_u32(&mut buf, self.term_entries.len() as u32);
        for entry in &self.term_entries {
            buf.extend_from_slice(&entry.term);
            buf.push(BYTE_SEPARATOR);
            let mut field_buf = [0u8; 2];
            LittleEndian::write_u16(&mut field_buf, entry.field);
            buf.extend_from_slice(&field_buf);
        }
        for &field in &self.stored_entries {
            let mut field_buf = [0u8; 2];
            LittleEndian::write_u16(&mut field_buf, field);
            buf.extend_from_slice(&field_buf);
            buf.push(BYTE_SEPARATOR);
        }
        buf
    }

    fn parse(key: &[u8], value: &[u8]) -> Result<BackIndexRow> {
        let doc = &key[1..];
        if doc.is_empty() {
            return Err(FalxError::row_decode("back index key has empty doc id"));
        }
        if value.len() < 4 {
            return Err(FalxError::row_decode(
                "back index value truncated before entry count",
            ));
        }
        let count = LittleEndian::read_u32(&value[0..4]) as usize;
        let mut cursor = 4;
        let mut term_entries = Vec::with_capacity(count);
        for _ in 0..count {
            let sep = value[cursor..]
                .iter()
                .position(|&b| b == BYTE_SEPARATOR)
                .ok_or_else(|| {
                    FalxError::row_decode("back index term entry missing separator")
                })?;
            let term = value[cursor..cursor + sep].to_vec();
            cursor += sep + 1;
            if value.len() < cursor + 2 {
                return Err(FalxError::row_decode(
                    "back index term entry truncated before field id",
                ));
            }
            let field = LittleEndian::read_u16(&value[cursor..cursor + 2]);
            cursor += 2;
            term_entries.push(BackIndexTermEntry { term, field });
        }
        let trailer = &value[cursor..];
        if trailer.len() % 3 != 0 {
            return Err(FalxError::row_decode(
                "back index stored entries truncated",
            ));
        }
        let mut stored_entries = Vec::with_capacity(trailer.len() / 3);
        for chunk in trailer.chunks_exact(3) {
            if chunk[2] != BYTE_SEPARATOR {
                return Err(FalxError::row_decode(
                    "back index stored entry missing separator",
                ));
            }
            stored_entries.push(LittleEndian::read_u16(&chunk[0..2]));
        }
        Ok(BackIndexRow::new(doc, term_entries, stored_entries))
    }
}

/// A stored field value row, key `{'s', docID, sep, fieldID:u16-LE}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    /// The document ID bytes.
    pub doc: Vec<u8>,
    /// The field id.
    pub field: u16,
    /// The stored value's type tag.
    pub typ: u8,
    /// The raw stored bytes.
    pub value_bytes: Vec<u8>,
}

impl StoredRow {
    /// Create a new stored row.
    pub fn new(doc: &[u8], field: u16, typ: u8, value_bytes: &[u8]) -> Self {
        StoredRow {
            doc: doc.to_vec(),
            field,
            typ,
            value_bytes: value_bytes.to_vec(),
        }
    }

    /// The stored-row key for the given coordinates.
    pub fn key_for(doc: &[u8], field: u16) -> Vec<u8> {
        let mut buf = Self::scan_prefix_for_doc(doc);
        let mut field_buf = [0u8; 2];
        LittleEndian::write_u16(&mut field_buf, field);
        buf.extend_from_slice(&field_buf);
        buf
    }

    /// The common prefix of every stored row of a document.
    pub fn scan_prefix_for_doc(doc: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + doc.len() + 1);
        buf.push(b's');
        buf.extend_from_slice(doc);
        buf.push(BYTE_SEPARATOR);
        buf
    }

    pub fn key(&self) -> Vec<u8> {
        Self::key_for(&self.doc, self.field)
    }

    pub fn value(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + self.value_bytes.len());
        buf.push(self.typ);
        buf.extend_from_slice(&self.value_bytes);
        buf
    }

    fn parse(key: &[u8], value: &[u8]) -> Result<StoredRow> {
        let body = &key[1..];
        let sep = body
            .iter()
            .position(|&b| b == BYTE_SEPARATOR)
            .ok_or_else(|| FalxError::row_decode("stored row key missing separator"))?;
        if sep == 0 {
            return Err(FalxError::row_decode("stored row key has empty doc id"));
        }
        let rest = &body[sep + 1..];
        if rest.len() != 2 {
            return Err(FalxError::row_decode(
                "stored row key must end with a field id",
            ));
        }
        let (typ, value_bytes) = value
            .split_first()
            .ok_or_else(|| FalxError::row_decode("stored row value missing type tag"))?;
        Ok(StoredRow::new(
            &body[..sep],
            LittleEndian::read_u16(rest),
            *typ,
            value_bytes,
        ))
    }
}

/// Opaque internal storage row, key `{'i', userKey}`.
///
/// Adapters use internal rows to persist their own metadata (mappings,
/// checkpoints) inside the index without interfering with index rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalRow {
    /// The caller-supplied key bytes.
    pub key_bytes: Vec<u8>,
    /// The raw value bytes.
    pub value_bytes: Vec<u8>,
}

impl InternalRow {
    /// Create a new internal row.
    pub fn new(key_bytes: &[u8], value_bytes: &[u8]) -> Self {
        InternalRow {
            key_bytes: key_bytes.to_vec(),
            value_bytes: value_bytes.to_vec(),
        }
    }

    /// The full row key for a caller-supplied key.
    pub fn key_for(key_bytes: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + key_bytes.len());
        buf.push(b'i');
        buf.extend_from_slice(key_bytes);
        buf
    }

    pub fn key(&self) -> Vec<u8> {
        Self::key_for(&self.key_bytes)
    }

    pub fn value(&self) -> Vec<u8> {
        self.value_bytes.clone()
    }

    fn parse(key: &[u8], value: &[u8]) -> Result<InternalRow> {
        Ok(InternalRow::new(&key[1..], value))
    }
}
