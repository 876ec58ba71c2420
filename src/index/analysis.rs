//! Document analysis: turning a document into index rows.
//!
//! Analysis is a pure function of the document, the analyzer, and the field
//! catalog. It performs no reads against the store, so it can run on worker
//! threads off the write path; only the resulting rows re-enter the
//! single-writer mutation sequence.

use ahash::AHashMap;

use crate::analysis::{Analyzer, Token, TokenFrequencies, TokenType};
use crate::document::{Document, Field, FieldValue};
use crate::index::field_cache::FieldCache;
use crate::index::row::{
    BackIndexRow, BackIndexTermEntry, Row, StoredRow, TermFrequencyRow, TermVector,
};

/// The rows produced by analyzing one document.
#[derive(Debug)]
pub struct AnalysisResult {
    /// The external document ID.
    pub doc_id: String,
    /// Every row the document contributes: field catalog rows for newly
    /// seen names, one posting per (term, field), stored rows, and the
    /// back index row (always last).
    pub rows: Vec<Row>,
}

struct FieldAnalysis {
    name: String,
    length: usize,
    frequencies: TokenFrequencies,
    include_term_vectors: bool,
}

/// Analyze a document into its complete row set.
///
/// Fields sharing a name are collated into a single posting set, composite
/// fields accumulate the frequencies of their member fields, and the back
/// index row records every posting and stored row emitted.
pub fn analyze_document(
    doc: &Document,
    field_cache: &FieldCache,
    analyzer: &dyn Analyzer,
) -> AnalysisResult {
    let doc_id = doc.id.as_bytes();
    let mut rows = Vec::new();
    let mut stored_entries: Vec<u16> = Vec::new();

    // pass 1: analyze real fields, collated per field id
    let mut analyses: Vec<(u16, FieldAnalysis)> = Vec::new();
    let mut slot_by_index: AHashMap<u16, usize> = AHashMap::new();
    for field in &doc.fields {
        let (field_index, new_field_row) = field_cache.field_index(&field.name);
        if let Some(field_row) = new_field_row {
            rows.push(Row::Field(field_row));
        }

        if field.options.is_stored() && !stored_entries.contains(&field_index) {
            rows.push(Row::Stored(StoredRow::new(
                doc_id,
                field_index,
                field.value.type_tag(),
                &field.value.encode(),
            )));
            stored_entries.push(field_index);
        }

        if !field.options.is_indexed() {
            continue;
        }
        let stream = tokenize(field, analyzer);
        let frequencies = TokenFrequencies::from_token_stream(&stream);
        match slot_by_index.get(&field_index).copied() {
            Some(slot) => {
                let analysis = &mut analyses[slot].1;
                analysis.length += stream.len();
                analysis.frequencies.merge_all(&field.name, &frequencies);
                analysis.include_term_vectors |= field.options.include_term_vectors();
            }
            None => {
                slot_by_index.insert(field_index, analyses.len());
                analyses.push((
                    field_index,
                    FieldAnalysis {
                        name: field.name.clone(),
                        length: stream.len(),
                        frequencies,
                        include_term_vectors: field.options.include_term_vectors(),
                    },
                ));
            }
        }
    }

    // pass 2: composite fields accumulate their members' frequencies
    for composite in &doc.composite_fields {
        let (field_index, new_field_row) = field_cache.field_index(&composite.name);
        if let Some(field_row) = new_field_row {
            rows.push(Row::Field(field_row));
        }
        let mut length = 0;
        let mut frequencies = TokenFrequencies::new();
        for (_, analysis) in &analyses {
            if composite.includes_field(&analysis.name) {
                length += analysis.length;
                frequencies.merge_all(&analysis.name, &analysis.frequencies);
            }
        }
        analyses.push((
            field_index,
            FieldAnalysis {
                name: composite.name.clone(),
                length,
                frequencies,
                include_term_vectors: composite.options.include_term_vectors(),
            },
        ));
    }

    // pass 3: emit postings
    let mut term_entries: Vec<BackIndexTermEntry> = Vec::new();
    for (field_index, analysis) in &analyses {
        let norm = if analysis.length > 0 {
            1.0 / (analysis.length as f32).sqrt()
        } else {
            0.0
        };
        for freq in analysis.frequencies.iter() {
            let vectors = if analysis.include_term_vectors {
                freq.locations
                    .iter()
                    .map(|location| TermVector {
                        field: location
                            .field
                            .as_deref()
                            .and_then(|name| field_cache.field_named(name))
                            .unwrap_or(*field_index),
                        pos: location.position as u64,
                        start: location.start as u64,
                        end: location.end as u64,
                    })
                    .collect()
            } else {
                Vec::new()
            };
            rows.push(Row::TermFrequency(TermFrequencyRow::with_vectors(
                &freq.term,
                *field_index,
                doc_id,
                freq.frequency(),
                norm,
                vectors,
            )));
            term_entries.push(BackIndexTermEntry {
                term: freq.term.clone(),
                field: *field_index,
            });
        }
    }

    rows.push(Row::BackIndex(BackIndexRow::new(
        doc_id,
        term_entries,
        stored_entries,
    )));

    AnalysisResult {
        doc_id: doc.id.clone(),
        rows,
    }
}

fn tokenize(field: &Field, analyzer: &dyn Analyzer) -> Vec<Token> {
    match &field.value {
        FieldValue::Text(text) => analyzer.analyze(text),
        other => match other.exact_term() {
            Some(term) => {
                let end = term.len();
                vec![Token {
                    term,
                    start: 0,
                    end,
                    position: 1,
                    token_type: match other {
                        FieldValue::Numeric(_) => TokenType::Numeric,
                        FieldValue::DateTime(_) => TokenType::DateTime,
                        FieldValue::Boolean(_) => TokenType::Boolean,
                        _ => TokenType::AlphaNumeric,
                    },
                }]
            }
            None => Vec::new(),
        },
    }
}
