//! Query tree: user-facing query types compiled into searchers.
//!
//! A [`Query`] describes what to match; calling
//! [`searcher`](Query::searcher) compiles it against an [`IndexReader`]
//! into a streaming [`Searcher`]. Queries validate their own shape first,
//! so malformed trees fail before touching the store.

use std::fmt::Debug;

use crate::error::{FalxError, Result};
use crate::index::IndexReader;
use crate::search::boolean::BooleanSearcher;
use crate::search::conjunction::ConjunctionSearcher;
use crate::search::disjunction::DisjunctionSearcher;
use crate::search::phrase::PhraseSearcher;
use crate::search::term::TermSearcher;
use crate::search::Searcher;

/// A node of a query tree.
pub trait Query: Debug {
    /// The boost factor scaling this node's score contribution.
    fn boost(&self) -> f64;

    /// Check this node (and its children) for structural validity.
    fn validate(&self) -> Result<()>;

    /// Compile this node into a searcher over the given reader.
    fn searcher(&self, reader: &IndexReader, explain: bool) -> Result<Box<dyn Searcher>>;
}

/// Matches documents containing an exact term in a field.
#[derive(Debug, Clone)]
pub struct TermQuery {
    field: String,
    term: String,
    boost: f64,
}

impl TermQuery {
    /// Create a term query.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, term: T) -> Self {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f64) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for TermQuery {
    fn boost(&self) -> f64 {
        self.boost
    }

    fn validate(&self) -> Result<()> {
        if self.term.is_empty() {
            return Err(FalxError::query("term query requires a non-empty term"));
        }
        Ok(())
    }

    fn searcher(&self, reader: &IndexReader, explain: bool) -> Result<Box<dyn Searcher>> {
        self.validate()?;
        Ok(Box::new(TermSearcher::new(
            reader, &self.term, &self.field, self.boost, explain,
        )?))
    }
}

/// Matches documents where the given terms occur at consecutive positions
/// in a field.
///
/// A `None` slot matches any term at that position. The queried field must
/// have been indexed with term vectors.
#[derive(Debug, Clone)]
pub struct PhraseQuery {
    field: String,
    terms: Vec<Option<String>>,
    boost: f64,
}

impl PhraseQuery {
    /// Create a phrase query with explicit position slots.
    pub fn new<F: Into<String>>(field: F, terms: Vec<Option<String>>) -> Self {
        PhraseQuery {
            field: field.into(),
            terms,
            boost: 1.0,
        }
    }

    /// Create a phrase query from consecutive terms.
    pub fn from_phrase<F: Into<String>>(field: F, phrase: &[&str]) -> Self {
        PhraseQuery::new(
            field,
            phrase.iter().map(|t| Some((*t).to_string())).collect(),
        )
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f64) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for PhraseQuery {
    fn boost(&self) -> f64 {
        self.boost
    }

    fn validate(&self) -> Result<()> {
        if self.terms.is_empty() {
            return Err(FalxError::query("phrase query requires at least one term"));
        }
        if !matches!(self.terms.first(), Some(Some(term)) if !term.is_empty()) {
            return Err(FalxError::query(
                "phrase query must start with a concrete term",
            ));
        }
        Ok(())
    }

    fn searcher(&self, reader: &IndexReader, explain: bool) -> Result<Box<dyn Searcher>> {
        self.validate()?;
        let mut distinct: Vec<&str> = self
            .terms
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();
        distinct.sort_unstable();
        distinct.dedup();

        let mut children: Vec<Box<dyn Searcher>> = Vec::with_capacity(distinct.len());
        for term in distinct {
            children.push(Box::new(TermSearcher::new(
                reader, term, &self.field, self.boost, explain,
            )?));
        }
        let must = Box::new(ConjunctionSearcher::new(children, explain));
        Ok(Box::new(PhraseSearcher::new(must, self.terms.clone())))
    }
}

/// Combines subqueries with must / should / must-not semantics.
#[derive(Debug, Default)]
pub struct BooleanQuery {
    must: Vec<Box<dyn Query>>,
    should: Vec<Box<dyn Query>>,
    must_not: Vec<Box<dyn Query>>,
    min_should: u64,
    boost: f64,
}

impl BooleanQuery {
    /// Create an empty boolean query.
    pub fn new() -> Self {
        BooleanQuery {
            boost: 1.0,
            ..BooleanQuery::default()
        }
    }

    /// Add a clause every match must satisfy.
    pub fn with_must(mut self, query: Box<dyn Query>) -> Self {
        self.must.push(query);
        self
    }

    /// Add a clause that boosts matches satisfying it.
    pub fn with_should(mut self, query: Box<dyn Query>) -> Self {
        self.should.push(query);
        self
    }

    /// Add a clause that excludes any document satisfying it.
    pub fn with_must_not(mut self, query: Box<dyn Query>) -> Self {
        self.must_not.push(query);
        self
    }

    /// Require at least `min` should clauses to match.
    pub fn with_min_should(mut self, min: u64) -> Self {
        self.min_should = min;
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f64) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for BooleanQuery {
    fn boost(&self) -> f64 {
        self.boost
    }

    fn validate(&self) -> Result<()> {
        if self.must.is_empty() && self.should.is_empty() {
            return Err(FalxError::query(
                "boolean query requires at least one must or should clause",
            ));
        }
        if self.min_should as usize > self.should.len() {
            return Err(FalxError::query(
                "boolean query cannot require more should matches than clauses",
            ));
        }
        for query in self
            .must
            .iter()
            .chain(self.should.iter())
            .chain(self.must_not.iter())
        {
            query.validate()?;
        }
        Ok(())
    }

    fn searcher(&self, reader: &IndexReader, explain: bool) -> Result<Box<dyn Searcher>> {
        self.validate()?;

        let compile = |queries: &[Box<dyn Query>]| -> Result<Vec<Box<dyn Searcher>>> {
            queries.iter().map(|q| q.searcher(reader, explain)).collect()
        };

        let must = if self.must.is_empty() {
            None
        } else {
            Some(Box::new(ConjunctionSearcher::new(compile(&self.must)?, explain))
                as Box<dyn Searcher>)
        };
        let should = if self.should.is_empty() {
            None
        } else {
            Some(Box::new(DisjunctionSearcher::new(
                compile(&self.should)?,
                self.min_should,
                explain,
            )) as Box<dyn Searcher>)
        };
        let must_not = if self.must_not.is_empty() {
            None
        } else {
            Some(Box::new(DisjunctionSearcher::new(
                compile(&self.must_not)?,
                0,
                explain,
            )) as Box<dyn Searcher>)
        };

        Ok(Box::new(BooleanSearcher::new(must, should, must_not, explain)))
    }
}
