//! TF-IDF scorers.
//!
//! Scoring follows the classic Lucene formula: a term match scores
//! `sqrt(tf) * fieldNorm * idf`, scaled by a query weight when the term
//! participates in a compound query. Compound scorers combine their
//! constituents by summation, with disjunctions additionally applying a
//! coordination factor.

use ahash::AHashMap;
use lazy_static::lazy_static;

use crate::index::reader::TermFieldDoc;
use crate::search::{
    merge_field_term_locations, DocumentMatch, Explanation, FieldTermLocationMap, Location,
};

lazy_static! {
    /// Precomputed square roots for small term frequencies.
    static ref SQRT_CACHE: [f64; 64] = {
        let mut cache = [0.0; 64];
        for (i, slot) in cache.iter_mut().enumerate() {
            *slot = (i as f64).sqrt();
        }
        cache
    };
}

/// Scores the postings of a single (term, field) pair.
#[derive(Debug)]
pub struct TermQueryScorer {
    term: String,
    field: String,
    boost: f64,
    explain: bool,
    idf: f64,
    query_norm: f64,
    query_weight: f64,
    idf_explanation: Option<Explanation>,
    query_weight_explanation: Option<Explanation>,
}

impl TermQueryScorer {
    /// Create a scorer from the corpus statistics of the (term, field)
    /// pair: the live document total and the term's document frequency.
    pub fn new(
        term: &str,
        field: &str,
        boost: f64,
        doc_total: u64,
        doc_freq: u64,
        explain: bool,
    ) -> Self {
        let idf = 1.0 + (doc_total as f64 / (doc_freq as f64 + 1.0)).ln();
        let idf_explanation = explain.then(|| {
            Explanation::new(idf, format!("idf(docFreq={doc_freq}, maxDocs={doc_total})"))
        });
        TermQueryScorer {
            term: term.to_string(),
            field: field.to_string(),
            boost,
            explain,
            idf,
            query_norm: 1.0,
            query_weight: 1.0,
            idf_explanation,
            query_weight_explanation: None,
        }
    }

    /// The squared weight this term contributes to query normalization.
    pub fn weight(&self) -> f64 {
        let sum = self.boost * self.idf;
        sum * sum
    }

    /// Apply a query normalization factor, fixing this term's query weight.
    pub fn set_query_norm(&mut self, query_norm: f64) {
        self.query_norm = query_norm;
        self.query_weight = self.boost * self.idf * query_norm;
        if self.explain {
            let children = vec![
                Explanation::new(self.boost, "boost"),
                self.idf_explanation.clone().unwrap_or_else(|| {
                    Explanation::new(self.idf, "idf")
                }),
                Explanation::new(query_norm, "queryNorm"),
            ];
            self.query_weight_explanation = Some(Explanation::with_children(
                self.query_weight,
                format!(
                    "queryWeight({}:{}^{}), product of:",
                    self.field, self.term, self.boost
                ),
                children,
            ));
        }
    }

    /// Score one posting into a document match.
    pub fn score(&self, term_match: &TermFieldDoc) -> DocumentMatch {
        let tf = if term_match.freq < 64 {
            SQRT_CACHE[term_match.freq as usize]
        } else {
            (term_match.freq as f64).sqrt()
        };
        let mut score = tf * term_match.norm * self.idf;

        let mut expl = self.explain.then(|| {
            Explanation::with_children(
                score,
                format!(
                    "fieldWeight({}:{} in {}), product of:",
                    self.field, self.term, term_match.id
                ),
                vec![
                    Explanation::new(
                        tf,
                        format!(
                            "tf(termFreq({}:{})={})",
                            self.field, self.term, term_match.freq
                        ),
                    ),
                    Explanation::new(
                        term_match.norm,
                        format!("fieldNorm(field={}, doc={})", self.field, term_match.id),
                    ),
                    self.idf_explanation
                        .clone()
                        .unwrap_or_else(|| Explanation::new(self.idf, "idf")),
                ],
            )
        });

        if self.query_weight != 1.0 {
            score *= self.query_weight;
            if let Some(field_expl) = expl.take() {
                let mut children = Vec::with_capacity(2);
                if let Some(qw) = &self.query_weight_explanation {
                    children.push(qw.clone());
                }
                children.push(field_expl);
                expl = Some(Explanation::with_children(
                    score,
                    format!(
                        "weight({}:{}^{} in {}), product of:",
                        self.field, self.term, self.boost, term_match.id
                    ),
                    children,
                ));
            }
        }

        let mut locations: FieldTermLocationMap = AHashMap::new();
        for vector in &term_match.vectors {
            locations
                .entry(vector.field.clone())
                .or_default()
                .entry(self.term.clone())
                .or_default()
                .push(Location {
                    pos: vector.pos,
                    start: vector.start,
                    end: vector.end,
                });
        }

        DocumentMatch {
            id: term_match.id.clone(),
            score,
            expl,
            locations,
        }
    }
}

/// Combines conjunction constituents by summing their scores.
#[derive(Debug)]
pub struct ConjunctionQueryScorer {
    explain: bool,
}

impl ConjunctionQueryScorer {
    pub fn new(explain: bool) -> Self {
        ConjunctionQueryScorer { explain }
    }

    /// Combine constituent matches for one document.
    pub fn score(&self, constituents: &[DocumentMatch]) -> DocumentMatch {
        let score: f64 = constituents.iter().map(|c| c.score).sum();
        let expl = self.explain.then(|| {
            Explanation::with_children(
                score,
                "sum of:",
                constituents
                    .iter()
                    .filter_map(|c| c.expl.clone())
                    .collect(),
            )
        });
        let mut locations: FieldTermLocationMap = AHashMap::new();
        for constituent in constituents {
            merge_field_term_locations(&mut locations, &constituent.locations);
        }
        DocumentMatch {
            id: constituents[0].id.clone(),
            score,
            expl,
            locations,
        }
    }
}

/// Combines disjunction constituents by summation, scaled by the fraction
/// of children that matched.
#[derive(Debug)]
pub struct DisjunctionQueryScorer {
    explain: bool,
}

impl DisjunctionQueryScorer {
    pub fn new(explain: bool) -> Self {
        DisjunctionQueryScorer { explain }
    }

    /// Combine the matching constituents for one document, out of
    /// `count_total` children overall.
    pub fn score(
        &self,
        constituents: &[DocumentMatch],
        count_matching: usize,
        count_total: usize,
    ) -> DocumentMatch {
        let sum: f64 = constituents.iter().map(|c| c.score).sum();
        let coord = count_matching as f64 / count_total as f64;
        let score = sum * coord;

        let expl = self.explain.then(|| {
            let sum_expl = Explanation::with_children(
                sum,
                "sum of:",
                constituents
                    .iter()
                    .filter_map(|c| c.expl.clone())
                    .collect(),
            );
            let coord_expl =
                Explanation::new(coord, format!("coord({count_matching}/{count_total})"));
            Explanation::with_children(score, "product of:", vec![sum_expl, coord_expl])
        });

        let mut locations: FieldTermLocationMap = AHashMap::new();
        for constituent in constituents {
            merge_field_term_locations(&mut locations, &constituent.locations);
        }
        DocumentMatch {
            id: constituents[0].id.clone(),
            score,
            expl,
            locations,
        }
    }
}
