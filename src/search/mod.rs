//! Streaming searchers over posting lists.
//!
//! A [`Searcher`] is a streaming cursor yielding [`DocumentMatch`]es in
//! ascending document ID order. Compound searchers (conjunction,
//! disjunction, boolean, phrase) merge the streams of their children
//! without materializing posting lists, leaning on
//! [`advance`](Searcher::advance) to skip ahead cheaply.

pub mod boolean;
pub mod collector;
pub mod conjunction;
pub mod disjunction;
pub mod explanation;
pub mod phrase;
pub mod scorer;
pub mod term;

pub use self::explanation::Explanation;

use ahash::AHashMap;
use serde::Serialize;

use crate::error::Result;

/// One occurrence of a matched term inside a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// 1-based token position.
    pub pos: u64,
    /// Byte offset of the start of the occurrence.
    pub start: u64,
    /// Byte offset of the end of the occurrence.
    pub end: u64,
}

/// Term text to its occurrence locations.
pub type TermLocationMap = AHashMap<String, Vec<Location>>;

/// Field name to its matched terms' locations.
pub type FieldTermLocationMap = AHashMap<String, TermLocationMap>;

/// Merge the locations of `other` into `map`.
pub fn merge_term_locations(map: &mut TermLocationMap, other: &TermLocationMap) {
    for (term, locations) in other {
        map.entry(term.clone())
            .or_default()
            .extend(locations.iter().cloned());
    }
}

/// Merge the per-field locations of `other` into `map`.
pub fn merge_field_term_locations(map: &mut FieldTermLocationMap, other: &FieldTermLocationMap) {
    for (field, terms) in other {
        merge_term_locations(map.entry(field.clone()).or_default(), terms);
    }
}

/// One matched document, scored and optionally explained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMatch {
    /// The external document ID.
    pub id: String,
    /// The TF-IDF relevance score.
    pub score: f64,
    /// Score breakdown, present when the search ran with explanations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expl: Option<Explanation>,
    /// Where the matched terms occurred, when term vectors were indexed.
    pub locations: FieldTermLocationMap,
}

/// A streaming cursor of scored matches in ascending document ID order.
pub trait Searcher {
    /// The next match, or `None` when exhausted.
    fn next(&mut self) -> Result<Option<DocumentMatch>>;

    /// The first match with a document ID greater than or equal to `id`.
    fn advance(&mut self, id: &str) -> Result<Option<DocumentMatch>>;

    /// An upper-bound estimate of the number of matches.
    fn count(&self) -> u64;

    /// The squared weight this searcher contributes to query normalization.
    fn weight(&self) -> f64;

    /// Push a query normalization factor down to the leaf scorers.
    fn set_query_norm(&mut self, query_norm: f64);

    /// The minimum number of child matches required, for searchers to
    /// which that is meaningful.
    fn min(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_field_term_locations() {
        let loc = |pos| Location {
            pos,
            start: 0,
            end: 4,
        };
        let mut a: FieldTermLocationMap = AHashMap::new();
        a.entry("desc".to_string())
            .or_default()
            .insert("beer".to_string(), vec![loc(1)]);

        let mut b: FieldTermLocationMap = AHashMap::new();
        b.entry("desc".to_string())
            .or_default()
            .insert("beer".to_string(), vec![loc(3)]);
        b.entry("name".to_string())
            .or_default()
            .insert("ale".to_string(), vec![loc(1)]);

        merge_field_term_locations(&mut a, &b);
        assert_eq!(a["desc"]["beer"].len(), 2);
        assert_eq!(a["name"]["ale"].len(), 1);
    }
}
