//! Leaf searcher over one (term, field) posting list.

use crate::error::Result;
use crate::index::reader::{IndexReader, TermFieldReader};
use crate::search::scorer::TermQueryScorer;
use crate::search::{DocumentMatch, Searcher};

/// Streams the postings of a single term, scored by TF-IDF.
pub struct TermSearcher {
    reader: TermFieldReader,
    scorer: TermQueryScorer,
}

impl TermSearcher {
    /// Create a searcher for `term` in `field`.
    pub fn new(
        index_reader: &IndexReader,
        term: &str,
        field: &str,
        boost: f64,
        explain: bool,
    ) -> Result<Self> {
        let reader = index_reader.term_field_reader(term.as_bytes(), field)?;
        let scorer = TermQueryScorer::new(
            term,
            field,
            boost,
            index_reader.doc_count(),
            reader.count(),
            explain,
        );
        Ok(TermSearcher { reader, scorer })
    }
}

impl Searcher for TermSearcher {
    fn next(&mut self) -> Result<Option<DocumentMatch>> {
        Ok(self.reader.next()?.map(|tm| self.scorer.score(&tm)))
    }

    fn advance(&mut self, id: &str) -> Result<Option<DocumentMatch>> {
        Ok(self.reader.advance(id)?.map(|tm| self.scorer.score(&tm)))
    }

    fn count(&self) -> u64 {
        self.reader.count()
    }

    fn weight(&self) -> f64 {
        self.scorer.weight()
    }

    fn set_query_norm(&mut self, query_norm: f64) {
        self.scorer.set_query_norm(query_norm);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::document::{Document, Field, IndexingOptions};
    use crate::index::Index;
    use crate::store::memory::MemoryStore;

    fn seeded_reader() -> IndexReader {
        let index = Index::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StandardAnalyzer::new()),
        );
        index.open().unwrap();
        for (id, text) in [
            ("a", "apple banana"),
            ("b", "banana banana banana banana"),
            ("c", "cherry"),
        ] {
            let mut doc = Document::new(id);
            doc.add_field(Field::text("desc", text, IndexingOptions::INDEXED));
            index.update(doc).unwrap();
        }
        index.reader()
    }

    #[test]
    fn test_streams_in_doc_id_order() {
        let reader = seeded_reader();
        let mut searcher = TermSearcher::new(&reader, "banana", "desc", 1.0, false).unwrap();
        assert_eq!(searcher.count(), 2);

        let first = searcher.next().unwrap().unwrap();
        let second = searcher.next().unwrap().unwrap();
        assert_eq!(first.id, "a");
        assert_eq!(second.id, "b");
        assert!(searcher.next().unwrap().is_none());

        // doc b has the higher term frequency but a much longer field; the
        // norm keeps scores finite and positive either way
        assert!(first.score > 0.0);
        assert!(second.score > 0.0);
    }

    #[test]
    fn test_advance() {
        let reader = seeded_reader();
        let mut searcher = TermSearcher::new(&reader, "banana", "desc", 1.0, false).unwrap();
        let rv = searcher.advance("b").unwrap().unwrap();
        assert_eq!(rv.id, "b");
        assert!(searcher.advance("z").unwrap().is_none());
    }

    #[test]
    fn test_absent_term_is_empty() {
        let reader = seeded_reader();
        let mut searcher = TermSearcher::new(&reader, "durian", "desc", 1.0, false).unwrap();
        assert_eq!(searcher.count(), 0);
        assert!(searcher.next().unwrap().is_none());
    }
}
