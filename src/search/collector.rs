//! Top-N result collection.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::search::{DocumentMatch, Searcher};

// reversed ordering so the heap's maximum is the worst retained match
struct HeapEntry(DocumentMatch);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .score
            .partial_cmp(&self.0.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.0.id.cmp(&other.0.id))
    }
}

/// Collects the top `k` matches by score, after skipping `skip` better
/// ones for pagination.
///
/// Memory stays bounded at `k + skip` entries no matter how many matches
/// the searcher yields. Final ordering is score descending with document
/// ID ascending breaking ties.
pub struct TopScoreCollector {
    k: usize,
    skip: usize,
    heap: BinaryHeap<HeapEntry>,
    total: u64,
    max_score: f64,
    took: Duration,
}

impl TopScoreCollector {
    /// Collect the top `k` matches.
    pub fn new(k: usize) -> Self {
        TopScoreCollector::with_skip(k, 0)
    }

    /// Collect the top `k` matches after skipping the best `skip`.
    pub fn with_skip(k: usize, skip: usize) -> Self {
        TopScoreCollector {
            k,
            skip,
            heap: BinaryHeap::with_capacity(k + skip + 1),
            total: 0,
            max_score: 0.0,
            took: Duration::ZERO,
        }
    }

    /// Drain a searcher to exhaustion, retaining the top matches.
    pub fn collect(&mut self, searcher: &mut dyn Searcher) -> Result<()> {
        let start = Instant::now();
        while let Some(rv) = searcher.next()? {
            self.total += 1;
            if rv.score > self.max_score {
                self.max_score = rv.score;
            }
            self.heap.push(HeapEntry(rv));
            if self.heap.len() > self.k + self.skip {
                self.heap.pop();
            }
        }
        self.took += start.elapsed();
        Ok(())
    }

    /// The total number of matches seen, retained or not.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The highest score seen.
    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// Wall time spent collecting.
    pub fn took(&self) -> Duration {
        self.took
    }

    /// The retained matches in final order, consuming the collector.
    pub fn results(self) -> Vec<DocumentMatch> {
        // the reversed entry ordering makes ascending order best-first
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| entry.0)
            .skip(self.skip)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use ahash::AHashMap;

    use super::*;
    use crate::error::Result;

    struct StubSearcher {
        matches: Vec<DocumentMatch>,
        pos: usize,
    }

    impl StubSearcher {
        fn new(scored: &[(&str, f64)]) -> Self {
            StubSearcher {
                matches: scored
                    .iter()
                    .map(|(id, score)| DocumentMatch {
                        id: id.to_string(),
                        score: *score,
                        expl: None,
                        locations: AHashMap::new(),
                    })
                    .collect(),
                pos: 0,
            }
        }
    }

    impl Searcher for StubSearcher {
        fn next(&mut self) -> Result<Option<DocumentMatch>> {
            let rv = self.matches.get(self.pos).cloned();
            self.pos += 1;
            Ok(rv)
        }

        fn advance(&mut self, id: &str) -> Result<Option<DocumentMatch>> {
            while let Some(rv) = self.next()? {
                if rv.id.as_str() >= id {
                    return Ok(Some(rv));
                }
            }
            Ok(None)
        }

        fn count(&self) -> u64 {
            self.matches.len() as u64
        }

        fn weight(&self) -> f64 {
            0.0
        }

        fn set_query_norm(&mut self, _query_norm: f64) {}
    }

    #[test]
    fn test_retains_top_k() {
        let mut searcher = StubSearcher::new(&[
            ("a", 1.0),
            ("b", 9.0),
            ("c", 2.0),
            ("d", 8.0),
            ("e", 5.0),
        ]);
        let mut collector = TopScoreCollector::new(3);
        collector.collect(&mut searcher).unwrap();

        assert_eq!(collector.total(), 5);
        assert!((collector.max_score() - 9.0).abs() < 1e-12);

        let ids: Vec<String> = collector.results().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["b", "d", "e"]);
    }

    #[test]
    fn test_skip_paginates() {
        let mut searcher = StubSearcher::new(&[
            ("a", 1.0),
            ("b", 9.0),
            ("c", 2.0),
            ("d", 8.0),
            ("e", 5.0),
        ]);
        let mut collector = TopScoreCollector::with_skip(2, 2);
        collector.collect(&mut searcher).unwrap();

        assert_eq!(collector.total(), 5);
        let ids: Vec<String> = collector.results().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["e", "c"]);
    }

    #[test]
    fn test_score_ties_break_by_id() {
        let mut searcher =
            StubSearcher::new(&[("c", 5.0), ("a", 5.0), ("b", 5.0)]);
        let mut collector = TopScoreCollector::new(2);
        collector.collect(&mut searcher).unwrap();

        let ids: Vec<String> = collector.results().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_fewer_matches_than_k() {
        let mut searcher = StubSearcher::new(&[("a", 1.0)]);
        let mut collector = TopScoreCollector::new(10);
        collector.collect(&mut searcher).unwrap();
        assert_eq!(collector.total(), 1);
        assert_eq!(collector.results().len(), 1);
    }
}
