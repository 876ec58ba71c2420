//! Error types for the Falx library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`FalxError`] enum. Decode errors are always surfaced rather than
//! defaulted: silently misparsing a row risks corrupting index statistics.

use std::io;

use thiserror::Error;

/// The main error type for Falx operations.
#[derive(Error, Debug)]
pub enum FalxError {
    /// I/O errors from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed row key or value encountered while decoding.
    #[error("Row decode error: {0}")]
    RowDecode(String),

    /// Index-level errors, including consistency violations between the
    /// back index and the posting rows.
    #[error("Index error: {0}")]
    Index(String),

    /// Storage-related errors propagated from the key-value layer.
    #[error("Store error: {0}")]
    Store(String),

    /// Analysis-related errors.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Query validation errors, reported before search execution begins.
    #[error("Query error: {0}")]
    Query(String),

    /// Search-time errors that abort a running search.
    #[error("Search error: {0}")]
    Search(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error.
    #[error("Error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`FalxError`].
pub type Result<T> = std::result::Result<T, FalxError>;

impl FalxError {
    /// Create a new row decode error.
    pub fn row_decode<S: Into<String>>(msg: S) -> Self {
        FalxError::RowDecode(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        FalxError::Index(msg.into())
    }

    /// Create a new store error.
    pub fn store<S: Into<String>>(msg: S) -> Self {
        FalxError::Store(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        FalxError::Analysis(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        FalxError::Query(msg.into())
    }

    /// Create a new search error.
    pub fn search<S: Into<String>>(msg: S) -> Self {
        FalxError::Search(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FalxError::row_decode("missing separator");
        assert_eq!(err.to_string(), "Row decode error: missing separator");

        let err = FalxError::query("boolean query must contain at least one must or should clause");
        assert!(err.to_string().starts_with("Query error:"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: FalxError = io_err.into();
        assert!(matches!(err, FalxError::Io(_)));
    }
}
