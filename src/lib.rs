//! # Falx
//!
//! An embeddable full-text search and indexing engine for Rust.
//!
//! Falx converts structured documents into an inverted index stored in a
//! pluggable key-value store, and answers boolean/phrase/term queries by
//! streaming and merging per-term posting lists into ranked document matches.
//!
//! ## Features
//!
//! - Binary-exact row encodings enabling ordered iteration and prefix scans
//! - Delta-based document updates that touch only changed postings
//! - Pluggable storage through a minimal ordered key-value contract
//! - Composable streaming searchers (term, conjunction, disjunction,
//!   boolean, phrase) with TF-IDF scoring and optional explanations
//! - Composite virtual fields (e.g. an `_all` field) aggregating siblings
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use falx::analysis::StandardAnalyzer;
//! use falx::document::{Document, Field, IndexingOptions};
//! use falx::index::Index;
//! use falx::query::{Query, TermQuery};
//! use falx::search::collector::TopScoreCollector;
//! use falx::store::memory::MemoryStore;
//!
//! # fn main() -> falx::error::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let index = Index::new(store, Arc::new(StandardAnalyzer::new()));
//! index.open()?;
//!
//! let mut doc = Document::new("a");
//! doc.add_field(Field::text("desc", "wandering albatross", IndexingOptions::INDEXED));
//! index.update(doc)?;
//!
//! let reader = index.reader();
//! let query = TermQuery::new("desc", "albatross");
//! let mut searcher = query.searcher(&reader, false)?;
//! let mut collector = TopScoreCollector::new(10);
//! collector.collect(searcher.as_mut())?;
//! assert_eq!(collector.total(), 1);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod search;
pub mod store;
pub mod util;

/// Crate version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
