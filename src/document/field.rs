//! Field types and per-field indexing options.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FalxError, Result};

/// Per-field indexing options.
///
/// Options combine with `|`: a field that is both indexed and stored uses
/// `IndexingOptions::INDEXED | IndexingOptions::STORED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingOptions(u8);

impl IndexingOptions {
    /// The field is neither indexed nor stored.
    pub const NONE: IndexingOptions = IndexingOptions(0);
    /// The field's terms are added to the inverted index.
    pub const INDEXED: IndexingOptions = IndexingOptions(1);
    /// The field's original value is stored for later reconstruction.
    pub const STORED: IndexingOptions = IndexingOptions(2);
    /// Positional term vectors are recorded alongside each posting.
    pub const TERM_VECTORS: IndexingOptions = IndexingOptions(4);

    /// True when the field participates in the inverted index.
    pub fn is_indexed(&self) -> bool {
        self.0 & Self::INDEXED.0 != 0
    }

    /// True when the original field value is stored.
    pub fn is_stored(&self) -> bool {
        self.0 & Self::STORED.0 != 0
    }

    /// True when term vectors are recorded for the field.
    pub fn include_term_vectors(&self) -> bool {
        self.0 & Self::TERM_VECTORS.0 != 0
    }
}

impl std::ops::BitOr for IndexingOptions {
    type Output = IndexingOptions;

    fn bitor(self, rhs: IndexingOptions) -> IndexingOptions {
        IndexingOptions(self.0 | rhs.0)
    }
}

impl Default for IndexingOptions {
    fn default() -> Self {
        IndexingOptions::INDEXED | IndexingOptions::STORED
    }
}

/// A field value, as a closed sum over the supported kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Free text, run through the analyzer when indexed.
    Text(String),
    /// A numeric value, indexed as a single exact term.
    Numeric(f64),
    /// A date/time value, indexed as a single exact term.
    DateTime(DateTime<Utc>),
    /// A boolean value, indexed as a single exact term.
    Boolean(bool),
    /// Raw bytes of an unrecognized kind; stored but never indexed.
    Unknown(Vec<u8>),
}

impl FieldValue {
    /// The stored-row type tag for this value kind.
    pub fn type_tag(&self) -> u8 {
        match self {
            FieldValue::Text(_) => b't',
            FieldValue::Numeric(_) => b'n',
            FieldValue::DateTime(_) => b'd',
            FieldValue::Boolean(_) => b'b',
            FieldValue::Unknown(_) => b'x',
        }
    }

    /// Encode this value as raw stored-row bytes (without the type tag).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            FieldValue::Text(s) => s.as_bytes().to_vec(),
            FieldValue::Numeric(n) => {
                let mut buf = [0u8; 8];
                LittleEndian::write_f64(&mut buf, *n);
                buf.to_vec()
            }
            FieldValue::DateTime(dt) => dt
                .to_rfc3339_opts(SecondsFormat::AutoSi, true)
                .into_bytes(),
            FieldValue::Boolean(b) => vec![*b as u8],
            FieldValue::Unknown(bytes) => bytes.clone(),
        }
    }

    /// Decode a stored-row value from its type tag and raw bytes.
    pub fn decode(type_tag: u8, bytes: &[u8]) -> Result<FieldValue> {
        match type_tag {
            b't' => Ok(FieldValue::Text(
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| FalxError::row_decode(format!("invalid stored text: {e}")))?,
            )),
            b'n' => {
                if bytes.len() != 8 {
                    return Err(FalxError::row_decode(format!(
                        "stored numeric value has {} bytes, expected 8",
                        bytes.len()
                    )));
                }
                Ok(FieldValue::Numeric(LittleEndian::read_f64(bytes)))
            }
            b'd' => {
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| FalxError::row_decode(format!("invalid stored datetime: {e}")))?;
                let dt = DateTime::parse_from_rfc3339(s)
                    .map_err(|e| FalxError::row_decode(format!("invalid stored datetime: {e}")))?;
                Ok(FieldValue::DateTime(dt.with_timezone(&Utc)))
            }
            b'b' => match bytes {
                [0] => Ok(FieldValue::Boolean(false)),
                [1] => Ok(FieldValue::Boolean(true)),
                _ => Err(FalxError::row_decode("invalid stored boolean value")),
            },
            b'x' => Ok(FieldValue::Unknown(bytes.to_vec())),
            other => Err(FalxError::row_decode(format!(
                "unknown stored field type tag '{}'",
                other as char
            ))),
        }
    }

    /// The canonical single-term text for non-text values.
    ///
    /// Text values go through the analyzer instead and return `None` here,
    /// as do unknown values, which are never indexed.
    pub fn exact_term(&self) -> Option<String> {
        match self {
            FieldValue::Text(_) | FieldValue::Unknown(_) => None,
            FieldValue::Numeric(n) => Some(n.to_string()),
            FieldValue::DateTime(dt) => {
                Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            FieldValue::Boolean(b) => Some(b.to_string()),
        }
    }
}

/// A named, typed field of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// The field name.
    pub name: String,
    /// The field value.
    pub value: FieldValue,
    /// Indexing options for this field.
    pub options: IndexingOptions,
}

impl Field {
    /// Create a new field.
    pub fn new<N: Into<String>>(name: N, value: FieldValue, options: IndexingOptions) -> Self {
        Field {
            name: name.into(),
            value,
            options,
        }
    }

    /// Create a text field.
    pub fn text<N: Into<String>, V: Into<String>>(
        name: N,
        value: V,
        options: IndexingOptions,
    ) -> Self {
        Field::new(name, FieldValue::Text(value.into()), options)
    }

    /// Create a numeric field.
    pub fn numeric<N: Into<String>>(name: N, value: f64, options: IndexingOptions) -> Self {
        Field::new(name, FieldValue::Numeric(value), options)
    }

    /// Create a date/time field.
    pub fn datetime<N: Into<String>>(
        name: N,
        value: DateTime<Utc>,
        options: IndexingOptions,
    ) -> Self {
        Field::new(name, FieldValue::DateTime(value), options)
    }

    /// Create a boolean field.
    pub fn boolean<N: Into<String>>(name: N, value: bool, options: IndexingOptions) -> Self {
        Field::new(name, FieldValue::Boolean(value), options)
    }
}
