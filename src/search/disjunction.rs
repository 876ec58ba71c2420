//! Disjunction (OR) of child searchers.

use crate::error::Result;
use crate::search::scorer::DisjunctionQueryScorer;
use crate::search::{DocumentMatch, Searcher};

/// Matches documents present in at least `min` child streams.
///
/// Each round the smallest current document ID wins; every child sitting
/// on that ID contributes to the score and is advanced for the next round.
pub struct DisjunctionSearcher {
    searchers: Vec<Box<dyn Searcher>>,
    currs: Vec<Option<DocumentMatch>>,
    scorer: DisjunctionQueryScorer,
    min: u64,
    initialized: bool,
}

impl DisjunctionSearcher {
    /// Create a disjunction requiring at least `min` children to match
    /// (zero means any). Computes and pushes down the query normalization
    /// for the subtree.
    pub fn new(searchers: Vec<Box<dyn Searcher>>, min: u64, explain: bool) -> Self {
        let mut rv = DisjunctionSearcher {
            currs: vec![None; searchers.len()],
            searchers,
            scorer: DisjunctionQueryScorer::new(explain),
            min,
            initialized: false,
        };
        rv.compute_query_norm();
        rv
    }

    fn compute_query_norm(&mut self) {
        let sum_of_squared_weights: f64 = self.searchers.iter().map(|s| s.weight()).sum();
        if sum_of_squared_weights > 0.0 {
            let query_norm = 1.0 / sum_of_squared_weights.sqrt();
            for searcher in &mut self.searchers {
                searcher.set_query_norm(query_norm);
            }
        }
    }

    fn init_searchers(&mut self) -> Result<()> {
        for (searcher, curr) in self.searchers.iter_mut().zip(self.currs.iter_mut()) {
            *curr = searcher.next()?;
        }
        self.initialized = true;
        Ok(())
    }

    fn smallest_id(&self) -> Option<String> {
        self.currs
            .iter()
            .flatten()
            .map(|curr| curr.id.as_str())
            .min()
            .map(str::to_string)
    }
}

impl Searcher for DisjunctionSearcher {
    fn next(&mut self) -> Result<Option<DocumentMatch>> {
        if !self.initialized {
            self.init_searchers()?;
        }
        loop {
            let Some(min_id) = self.smallest_id() else {
                return Ok(None);
            };

            let matching: Vec<DocumentMatch> = self
                .currs
                .iter()
                .flatten()
                .filter(|curr| curr.id == min_id)
                .cloned()
                .collect();
            let count_matching = matching.len();
            let rv = self
                .scorer
                .score(&matching, count_matching, self.searchers.len());

            // advance every child sitting on the consumed ID
            for (searcher, curr) in self.searchers.iter_mut().zip(self.currs.iter_mut()) {
                if matches!(curr, Some(c) if c.id == min_id) {
                    *curr = searcher.next()?;
                }
            }

            if count_matching as u64 >= self.min.max(1) {
                return Ok(Some(rv));
            }
        }
    }

    fn advance(&mut self, id: &str) -> Result<Option<DocumentMatch>> {
        if !self.initialized {
            self.init_searchers()?;
        }
        for (searcher, curr) in self.searchers.iter_mut().zip(self.currs.iter_mut()) {
            *curr = searcher.advance(id)?;
        }
        self.next()
    }

    fn count(&self) -> u64 {
        self.searchers.iter().map(|s| s.count()).sum()
    }

    fn weight(&self) -> f64 {
        self.searchers.iter().map(|s| s.weight()).sum()
    }

    fn set_query_norm(&mut self, query_norm: f64) {
        for searcher in &mut self.searchers {
            searcher.set_query_norm(query_norm);
        }
    }

    fn min(&self) -> u64 {
        self.min
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::document::{Document, Field, IndexingOptions};
    use crate::index::{Index, IndexReader};
    use crate::search::term::TermSearcher;
    use crate::store::memory::MemoryStore;

    fn seeded_reader() -> IndexReader {
        let index = Index::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StandardAnalyzer::new()),
        );
        index.open().unwrap();
        for (id, text) in [
            ("1", "ale"),
            ("2", "stout"),
            ("3", "ale stout"),
            ("4", "porter"),
        ] {
            let mut doc = Document::new(id);
            doc.add_field(Field::text("desc", text, IndexingOptions::INDEXED));
            index.update(doc).unwrap();
        }
        index.reader()
    }

    fn term(reader: &IndexReader, term: &str) -> Box<dyn Searcher> {
        Box::new(TermSearcher::new(reader, term, "desc", 1.0, false).unwrap())
    }

    #[test]
    fn test_unions_children() {
        let reader = seeded_reader();
        let mut searcher = DisjunctionSearcher::new(
            vec![term(&reader, "ale"), term(&reader, "stout")],
            0,
            false,
        );

        let mut ids = Vec::new();
        while let Some(rv) = searcher.next().unwrap() {
            ids.push(rv.id);
        }
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_min_should_match() {
        let reader = seeded_reader();
        let mut searcher = DisjunctionSearcher::new(
            vec![term(&reader, "ale"), term(&reader, "stout")],
            2,
            false,
        );

        // only doc 3 contains both terms
        let rv = searcher.next().unwrap().unwrap();
        assert_eq!(rv.id, "3");
        assert!(searcher.next().unwrap().is_none());
    }

    #[test]
    fn test_advance() {
        let reader = seeded_reader();
        let mut searcher = DisjunctionSearcher::new(
            vec![term(&reader, "ale"), term(&reader, "stout")],
            0,
            false,
        );
        let rv = searcher.advance("2").unwrap().unwrap();
        assert_eq!(rv.id, "2");
        let rv = searcher.next().unwrap().unwrap();
        assert_eq!(rv.id, "3");
    }
}
