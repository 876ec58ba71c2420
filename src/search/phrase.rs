//! Exact phrase matching over term vector positions.

use ahash::AHashMap;

use crate::error::Result;
use crate::search::{DocumentMatch, FieldTermLocationMap, Searcher, TermLocationMap};

/// Filters a conjunction of term matches down to documents where the terms
/// occur at consecutive positions.
///
/// `terms` holds one slot per phrase position; a `None` slot matches any
/// term there. Requires the queried field to have been indexed with term
/// vectors; without them no candidate can confirm positions and nothing
/// matches.
pub struct PhraseSearcher {
    must: Box<dyn Searcher>,
    terms: Vec<Option<String>>,
    curr_must: Option<DocumentMatch>,
    initialized: bool,
}

impl PhraseSearcher {
    /// Create a phrase searcher over `must`, a conjunction of searchers
    /// for the phrase's distinct terms.
    pub fn new(must: Box<dyn Searcher>, terms: Vec<Option<String>>) -> Self {
        PhraseSearcher {
            must,
            terms,
            curr_must: None,
            initialized: false,
        }
    }

    /// Find every phrase occurrence in one candidate's locations, keyed by
    /// field. Empty when the phrase never occurs consecutively.
    fn phrase_locations(&self, candidate: &DocumentMatch) -> FieldTermLocationMap {
        let Some(first_term) = self.terms.first().and_then(|t| t.as_deref()) else {
            return AHashMap::new();
        };
        let mut rv: FieldTermLocationMap = AHashMap::new();
        for (field, term_locations) in &candidate.locations {
            let Some(starts) = term_locations.get(first_term) else {
                continue;
            };
            let mut field_matches: TermLocationMap = AHashMap::new();
            'start: for start in starts {
                let mut run: TermLocationMap = AHashMap::new();
                for (i, slot) in self.terms.iter().enumerate() {
                    let Some(term) = slot else {
                        continue;
                    };
                    let wanted_pos = start.pos + i as u64;
                    let Some(candidates) = term_locations.get(term) else {
                        continue 'start;
                    };
                    let Some(location) = candidates.iter().find(|l| l.pos == wanted_pos)
                    else {
                        continue 'start;
                    };
                    run.entry(term.clone()).or_default().push(location.clone());
                }
                for (term, locations) in run {
                    field_matches.entry(term).or_default().extend(locations);
                }
            }
            if !field_matches.is_empty() {
                rv.insert(field.clone(), field_matches);
            }
        }
        rv
    }
}

impl Searcher for PhraseSearcher {
    fn next(&mut self) -> Result<Option<DocumentMatch>> {
        if !self.initialized {
            self.curr_must = self.must.next()?;
            self.initialized = true;
        }
        while let Some(candidate) = self.curr_must.take() {
            let locations = self.phrase_locations(&candidate);
            self.curr_must = self.must.next()?;
            if !locations.is_empty() {
                return Ok(Some(DocumentMatch {
                    locations,
                    ..candidate
                }));
            }
        }
        Ok(None)
    }

    fn advance(&mut self, id: &str) -> Result<Option<DocumentMatch>> {
        self.curr_must = self.must.advance(id)?;
        self.initialized = true;
        self.next()
    }

    fn count(&self) -> u64 {
        self.must.count()
    }

    fn weight(&self) -> f64 {
        self.must.weight()
    }

    fn set_query_norm(&mut self, query_norm: f64) {
        self.must.set_query_norm(query_norm);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::document::{Document, Field, IndexingOptions};
    use crate::index::{Index, IndexReader};
    use crate::search::conjunction::ConjunctionSearcher;
    use crate::search::term::TermSearcher;
    use crate::store::memory::MemoryStore;

    fn seeded_reader() -> IndexReader {
        let index = Index::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StandardAnalyzer::new()),
        );
        index.open().unwrap();
        for (id, text) in [
            ("1", "angst beer"),
            ("2", "beer angst"),
            ("3", "angst and then some beer"),
            ("4", "mind the gap carefully"),
        ] {
            let mut doc = Document::new(id);
            doc.add_field(Field::text(
                "desc",
                text,
                IndexingOptions::INDEXED | IndexingOptions::TERM_VECTORS,
            ));
            index.update(doc).unwrap();
        }
        index.reader()
    }

    fn phrase(reader: &IndexReader, terms: Vec<Option<&str>>) -> PhraseSearcher {
        let mut distinct: Vec<&str> = terms.iter().flatten().copied().collect();
        distinct.sort_unstable();
        distinct.dedup();
        let children: Vec<Box<dyn Searcher>> = distinct
            .iter()
            .map(|t| {
                Box::new(TermSearcher::new(reader, t, "desc", 1.0, false).unwrap())
                    as Box<dyn Searcher>
            })
            .collect();
        PhraseSearcher::new(
            Box::new(ConjunctionSearcher::new(children, false)),
            terms.into_iter().map(|t| t.map(str::to_string)).collect(),
        )
    }

    #[test]
    fn test_matches_only_consecutive_terms() {
        let reader = seeded_reader();
        let mut searcher = phrase(&reader, vec![Some("angst"), Some("beer")]);

        // docs 1, 2, 3 all contain both terms; only doc 1 has the phrase
        let rv = searcher.next().unwrap().unwrap();
        assert_eq!(rv.id, "1");
        assert_eq!(rv.locations["desc"]["beer"][0].pos, 2);
        assert!(searcher.next().unwrap().is_none());
    }

    #[test]
    fn test_wildcard_slot() {
        let reader = seeded_reader();
        let mut searcher = phrase(&reader, vec![Some("mind"), None, Some("gap")]);

        let rv = searcher.next().unwrap().unwrap();
        assert_eq!(rv.id, "4");
        assert!(searcher.next().unwrap().is_none());
    }

    #[test]
    fn test_advance() {
        let reader = seeded_reader();
        let mut searcher = phrase(&reader, vec![Some("angst"), Some("beer")]);
        assert!(searcher.advance("2").unwrap().is_none());
    }
}
