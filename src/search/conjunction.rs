//! Conjunction (AND) of child searchers.

use crate::error::Result;
use crate::search::scorer::ConjunctionQueryScorer;
use crate::search::{DocumentMatch, Searcher};

/// Matches documents present in every child stream.
///
/// Children are ordered by ascending match count so the rarest stream
/// drives candidate selection and the denser streams skip to candidates
/// with [`advance`](Searcher::advance).
pub struct ConjunctionSearcher {
    searchers: Vec<Box<dyn Searcher>>,
    currs: Vec<Option<DocumentMatch>>,
    scorer: ConjunctionQueryScorer,
    initialized: bool,
}

impl ConjunctionSearcher {
    /// Create a conjunction of the given children. Computes and pushes
    /// down the query normalization for the subtree.
    pub fn new(mut searchers: Vec<Box<dyn Searcher>>, explain: bool) -> Self {
        searchers.sort_by_key(|s| s.count());
        let mut rv = ConjunctionSearcher {
            currs: vec![None; searchers.len()],
            searchers,
            scorer: ConjunctionQueryScorer::new(explain),
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
}

impl Searcher for ConjunctionSearcher {
    fn next(&mut self) -> Result<Option<DocumentMatch>> {
        if !self.initialized {
            self.init_searchers()?;
        }
        if self.searchers.is_empty() {
            return Ok(None);
        }
        'outer: loop {
            // the largest current ID is the only possible next match
            let mut max_id = match &self.currs[0] {
                Some(curr) => curr.id.clone(),
                None => return Ok(None),
            };
            for curr in &self.currs {
                match curr {
                    Some(curr) if curr.id > max_id => max_id = curr.id.clone(),
                    Some(_) => {}
                    None => return Ok(None),
                }
            }

            for i in 0..self.searchers.len() {
                let behind = matches!(&self.currs[i], Some(curr) if curr.id != max_id);
                if behind {
                    self.currs[i] = self.searchers[i].advance(&max_id)?;
                    match &self.currs[i] {
                        None => return Ok(None),
                        Some(curr) if curr.id != max_id => continue 'outer,
                        Some(_) => {}
                    }
                }
            }

            // every child agrees on max_id
            let constituents: Vec<DocumentMatch> =
                self.currs.iter().flatten().cloned().collect();
            let rv = self.scorer.score(&constituents);

            for (searcher, curr) in self.searchers.iter_mut().zip(self.currs.iter_mut()) {
                *curr = searcher.next()?;
            }
            return Ok(Some(rv));
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
        self.searchers.iter().map(|s| s.count()).min().unwrap_or(0)
    }

    fn weight(&self) -> f64 {
        self.searchers.iter().map(|s| s.weight()).sum()
    }

    fn set_query_norm(&mut self, query_norm: f64) {
        for searcher in &mut self.searchers {
            searcher.set_query_norm(query_norm);
        }
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
            ("1", "beer and food"),
            ("2", "beer only"),
            ("3", "food only"),
            ("4", "beer and food and more"),
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
    fn test_intersects_children() {
        let reader = seeded_reader();
        let mut searcher = ConjunctionSearcher::new(
            vec![term(&reader, "beer"), term(&reader, "food")],
            false,
        );

        let mut ids = Vec::new();
        while let Some(rv) = searcher.next().unwrap() {
            assert!(rv.score > 0.0);
            ids.push(rv.id);
        }
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_empty_child_empties_intersection() {
        let reader = seeded_reader();
        let mut searcher = ConjunctionSearcher::new(
            vec![term(&reader, "beer"), term(&reader, "zebra")],
            false,
        );
        assert!(searcher.next().unwrap().is_none());
    }

    #[test]
    fn test_advance() {
        let reader = seeded_reader();
        let mut searcher = ConjunctionSearcher::new(
            vec![term(&reader, "beer"), term(&reader, "food")],
            false,
        );
        let rv = searcher.advance("2").unwrap().unwrap();
        assert_eq!(rv.id, "4");
        assert!(searcher.next().unwrap().is_none());
    }
}
