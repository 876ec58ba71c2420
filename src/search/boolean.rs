//! Boolean combination of must / should / must-not searchers.

use crate::error::Result;
use crate::search::scorer::ConjunctionQueryScorer;
use crate::search::{DocumentMatch, Searcher};

/// Matches documents satisfying all must clauses and enough should
/// clauses, excluding any document matched by the must-not clauses.
///
/// The must stream drives candidate selection; with no must clauses the
/// should stream drives instead. Must-not matches contribute nothing to
/// the score or the query normalization.
pub struct BooleanSearcher {
    must: Option<Box<dyn Searcher>>,
    should: Option<Box<dyn Searcher>>,
    must_not: Option<Box<dyn Searcher>>,
    scorer: ConjunctionQueryScorer,
    curr_must: Option<DocumentMatch>,
    curr_should: Option<DocumentMatch>,
    curr_must_not: Option<DocumentMatch>,
    current_id: Option<String>,
    initialized: bool,
}

impl BooleanSearcher {
    /// Create a boolean searcher. At least one of `must` or `should` must
    /// be present for anything to match.
    pub fn new(
        must: Option<Box<dyn Searcher>>,
        should: Option<Box<dyn Searcher>>,
        must_not: Option<Box<dyn Searcher>>,
        explain: bool,
    ) -> Self {
        let mut rv = BooleanSearcher {
            must,
            should,
            must_not,
            scorer: ConjunctionQueryScorer::new(explain),
            curr_must: None,
            curr_should: None,
            curr_must_not: None,
            current_id: None,
            initialized: false,
        };
        rv.compute_query_norm();
        rv
    }

    fn compute_query_norm(&mut self) {
        let sum_of_squared_weights = self.must.as_ref().map_or(0.0, |s| s.weight())
            + self.should.as_ref().map_or(0.0, |s| s.weight());
        if sum_of_squared_weights > 0.0 {
            let query_norm = 1.0 / sum_of_squared_weights.sqrt();
            if let Some(must) = &mut self.must {
                must.set_query_norm(query_norm);
            }
            if let Some(should) = &mut self.should {
                should.set_query_norm(query_norm);
            }
        }
    }

    fn init_searchers(&mut self) -> Result<()> {
        if let Some(must) = &mut self.must {
            self.curr_must = must.next()?;
        }
        if let Some(should) = &mut self.should {
            self.curr_should = should.next()?;
        }
        if let Some(must_not) = &mut self.must_not {
            self.curr_must_not = must_not.next()?;
        }
        self.update_current_id();
        self.initialized = true;
        Ok(())
    }

    /// Move the driving stream forward and refresh the candidate ID.
    fn advance_next_must(&mut self) -> Result<()> {
        if let Some(must) = &mut self.must {
            self.curr_must = must.next()?;
        } else if let Some(should) = &mut self.should {
            self.curr_should = should.next()?;
        }
        self.update_current_id();
        Ok(())
    }

    fn update_current_id(&mut self) {
        self.current_id = if self.must.is_some() {
            self.curr_must.as_ref().map(|m| m.id.clone())
        } else {
            self.curr_should.as_ref().map(|m| m.id.clone())
        };
    }
}

impl Searcher for BooleanSearcher {
    fn next(&mut self) -> Result<Option<DocumentMatch>> {
        if !self.initialized {
            self.init_searchers()?;
        }

        while let Some(current_id) = self.current_id.clone() {
            if matches!(&self.curr_must_not, Some(mn) if mn.id < current_id) {
                if let Some(must_not) = &mut self.must_not {
                    self.curr_must_not = must_not.advance(&current_id)?;
                }
            }
            if matches!(&self.curr_must_not, Some(mn) if mn.id == current_id) {
                // candidate is excluded
                self.advance_next_must()?;
                continue;
            }

            if let Some(should) = &mut self.should {
                if matches!(&self.curr_should, Some(s) if s.id < current_id) {
                    self.curr_should = should.advance(&current_id)?;
                }
            }

            if matches!(&self.curr_should, Some(s) if s.id == current_id) {
                // should matches contribute to the score
                let mut constituents = Vec::with_capacity(2);
                if let Some(must) = &self.curr_must {
                    constituents.push(must.clone());
                }
                if let Some(should) = &self.curr_should {
                    constituents.push(should.clone());
                }
                let rv = self.scorer.score(&constituents);
                self.advance_next_must()?;
                return Ok(Some(rv));
            }

            let should_min = self.should.as_ref().map_or(0, |s| s.min());
            if should_min == 0 {
                // a must-only match is fine when shoulds are optional
                if let Some(must_match) = self.curr_must.clone() {
                    let rv = self.scorer.score(&[must_match]);
                    self.advance_next_must()?;
                    return Ok(Some(rv));
                }
            }

            self.advance_next_must()?;
        }
        Ok(None)
    }

    fn advance(&mut self, id: &str) -> Result<Option<DocumentMatch>> {
        if !self.initialized {
            self.init_searchers()?;
        }
        if let Some(must) = &mut self.must {
            self.curr_must = must.advance(id)?;
        }
        if let Some(should) = &mut self.should {
            self.curr_should = should.advance(id)?;
        }
        if let Some(must_not) = &mut self.must_not {
            self.curr_must_not = must_not.advance(id)?;
        }
        self.update_current_id();
        self.next()
    }

    fn count(&self) -> u64 {
        self.must.as_ref().map_or(0, |s| s.count())
            + self.should.as_ref().map_or(0, |s| s.count())
    }

    fn weight(&self) -> f64 {
        self.must.as_ref().map_or(0.0, |s| s.weight())
            + self.should.as_ref().map_or(0.0, |s| s.weight())
    }

    fn set_query_norm(&mut self, query_norm: f64) {
        if let Some(must) = &mut self.must {
            must.set_query_norm(query_norm);
        }
        if let Some(should) = &mut self.should {
            should.set_query_norm(query_norm);
        }
    }
}
