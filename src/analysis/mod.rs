//! Text analysis contract and token frequency types.
//!
//! The engine consumes text analysis as an opaque service: an [`Analyzer`]
//! turns a field's raw text into an ordered, finite [`TokenStream`]. The
//! token stream is then grouped by term into [`TokenFrequencies`], the
//! intermediate form consumed by the indexing engine.

pub mod standard;

pub use self::standard::StandardAnalyzer;

use std::fmt;

use ahash::AHashMap;

/// Classification of a token's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenType {
    /// Alphanumeric word content.
    #[default]
    AlphaNumeric,
    /// Numeric content.
    Numeric,
    /// Date/time content.
    DateTime,
    /// Boolean content.
    Boolean,
}

/// One occurrence of a term at a particular location in a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The term text.
    pub term: String,
    /// Byte offset of the beginning of the term in the field.
    pub start: usize,
    /// Byte offset of the end of the term in the field.
    pub end: usize,
    /// 1-based index of the token in the stream.
    pub position: usize,
    /// Classification of the token content.
    pub token_type: TokenType,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Start: {} End: {} Position: {} Token: {}",
            self.start, self.end, self.position, self.term
        )
    }
}

/// An ordered, finite sequence of tokens produced by one analysis call.
pub type TokenStream = Vec<Token>;

/// Trait for analyzers that convert raw field text into a token stream.
///
/// The stream is not restartable; call [`Analyzer::analyze`] again for a
/// fresh stream.
pub trait Analyzer: Send + Sync + fmt::Debug {
    /// Analyze the given text and return an ordered stream of tokens.
    fn analyze(&self, text: &str) -> TokenStream;
}

/// One occurrence location of a term, optionally tagged with the field it
/// originated from (used when composite fields merge foreign frequencies).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLocation {
    /// Source field name, set only for locations merged in from another
    /// field by a composite field.
    pub field: Option<String>,
    /// Byte offset of the beginning of the occurrence.
    pub start: usize,
    /// Byte offset of the end of the occurrence.
    pub end: usize,
    /// 1-based token position of the occurrence.
    pub position: usize,
}

/// Per-term occurrence information within one field of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFreq {
    /// The term bytes.
    pub term: Vec<u8>,
    /// All occurrence locations of the term.
    pub locations: Vec<TokenLocation>,
}

impl TokenFreq {
    /// The number of occurrences of this term.
    pub fn frequency(&self) -> u64 {
        self.locations.len() as u64
    }
}

/// Map from term bytes to occurrence information for one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenFrequencies {
    map: AHashMap<Vec<u8>, TokenFreq>,
}

impl TokenFrequencies {
    /// Create an empty frequency map.
    pub fn new() -> Self {
        TokenFrequencies::default()
    }

    /// Group a token stream by term.
    pub fn from_token_stream(stream: &TokenStream) -> Self {
        let mut rv = TokenFrequencies::new();
        for token in stream {
            let term = token.term.as_bytes().to_vec();
            let location = TokenLocation {
                field: None,
                start: token.start,
                end: token.end,
                position: token.position,
            };
            rv.map
                .entry(term.clone())
                .or_insert_with(|| TokenFreq {
                    term,
                    locations: Vec::new(),
                })
                .locations
                .push(location);
        }
        rv
    }

    /// Merge all frequencies from `other` into `self`, tagging the merged
    /// locations with `source_field` so term vectors can later resolve to
    /// the correct origin field.
    pub fn merge_all(&mut self, source_field: &str, other: &TokenFrequencies) {
        for (term, freq) in &other.map {
            let entry = self.map.entry(term.clone()).or_insert_with(|| TokenFreq {
                term: term.clone(),
                locations: Vec::new(),
            });
            for location in &freq.locations {
                let mut location = location.clone();
                if location.field.is_none() {
                    location.field = Some(source_field.to_string());
                }
                entry.locations.push(location);
            }
        }
    }

    /// The number of distinct terms.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no terms have been recorded.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Look up the frequency entry for a term.
    pub fn get(&self, term: &[u8]) -> Option<&TokenFreq> {
        self.map.get(term)
    }

    /// Iterate over all term frequency entries.
    pub fn iter(&self) -> impl Iterator<Item = &TokenFreq> {
        self.map.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(term: &str, position: usize, start: usize, end: usize) -> Token {
        Token {
            term: term.to_string(),
            start,
            end,
            position,
            token_type: TokenType::AlphaNumeric,
        }
    }

    #[test]
    fn test_token_frequencies_grouping() {
        let stream = vec![
            token("beer", 1, 0, 4),
            token("beer", 2, 5, 9),
            token("couch", 3, 10, 15),
        ];
        let freqs = TokenFrequencies::from_token_stream(&stream);
        assert_eq!(freqs.len(), 2);
        assert_eq!(freqs.get(b"beer").unwrap().frequency(), 2);
        assert_eq!(freqs.get(b"couch").unwrap().frequency(), 1);
        assert_eq!(freqs.get(b"beer").unwrap().locations[1].position, 2);
    }

    #[test]
    fn test_merge_all_tags_source_field() {
        let stream_a = vec![token("beer", 1, 0, 4)];
        let stream_b = vec![token("beer", 1, 0, 4), token("angst", 2, 5, 10)];
        let mut merged = TokenFrequencies::from_token_stream(&stream_a);
        merged.merge_all("name", &TokenFrequencies::from_token_stream(&stream_b));

        let beer = merged.get(b"beer").unwrap();
        assert_eq!(beer.frequency(), 2);
        assert_eq!(beer.locations[0].field, None);
        assert_eq!(beer.locations[1].field, Some("name".to_string()));
        assert_eq!(merged.get(b"angst").unwrap().locations[0].field, Some("name".to_string()));
    }
}
