//! A standard analyzer splitting on Unicode word boundaries.

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::{Analyzer, Token, TokenStream, TokenType};

/// An analyzer that splits text on Unicode word boundaries and lowercases
/// each term.
///
/// This is the default analyzer used when no external analyzer is supplied.
/// Terms it produces never contain the `0xff` row separator byte, which the
/// row codec requires of all indexed terms.
#[derive(Debug, Clone, Default)]
pub struct StandardAnalyzer;

impl StandardAnalyzer {
    /// Create a new standard analyzer.
    pub fn new() -> Self {
        StandardAnalyzer
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> TokenStream {
        let mut position = 0;
        text.unicode_word_indices()
            .map(|(start, word)| {
                position += 1;
                Token {
                    term: word.to_lowercase(),
                    start,
                    end: start + word.len(),
                    position,
                    token_type: TokenType::AlphaNumeric,
                }
            })
            .collect()
    }
}
