/*!
 * Sentence segmentation adapters.
 *
 * The correction pipeline never splits text itself; it asks a `Segmenter`
 * for an ordered list of sentence spans. The default implementation uses
 * Unicode Standard Annex #29 sentence boundaries and is lossless: joining
 * the returned sentence texts gives back the input byte for byte, because
 * whitespace and line breaks stay attached to the sentence they follow.
 */

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Debug;
use unicode_segmentation::UnicodeSegmentation;

/// A contiguous slice of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Byte offset of the first byte in the document
    pub start: usize,
    /// Byte offset one past the last byte in the document
    pub end: usize,
    /// The sentence text, including trailing whitespace
    pub text: String,
}

impl Sentence {
    /// Create a sentence starting at `start`
    pub fn new(start: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            start,
            end: start + text.len(),
            text,
        }
    }

    /// Length in characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Sentence boundary detection service
///
/// Implementations must be deterministic for identical input so that chunk
/// planning is reproducible.
pub trait Segmenter: Send + Sync + Debug {
    /// Split `text` into ordered sentence spans
    ///
    /// # Arguments
    /// * `text` - The text to segment
    /// * `language_hint` - Optional ISO 639 code of the text language
    fn segment(&self, text: &str, language_hint: Option<&str>) -> Vec<Sentence>;
}

/// UAX #29 sentence segmenter
#[derive(Debug, Clone, Default)]
pub struct UnicodeSegmenter;

impl UnicodeSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl Segmenter for UnicodeSegmenter {
    fn segment(&self, text: &str, language_hint: Option<&str>) -> Vec<Sentence> {
        // UAX #29 rules are language independent
        if let Some(hint) = language_hint {
            trace!("Segmenting {} bytes (language hint: {})", text.len(), hint);
        }

        let pieces: Vec<(usize, &str)> = text.split_sentence_bound_indices().collect();
        merge_whitespace_pieces(text, &pieces)
    }
}

/// Clause-level segmenter splitting after punctuation and line breaks
///
/// Used where UAX #29 finds too few boundaries, e.g. on model output that
/// merged several sentences with commas.
#[derive(Debug, Clone, Default)]
pub struct DelimiterSegmenter;

static CLAUSE_DELIMITER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.!?;:,…]+[\s]+|\n+").expect("clause delimiter pattern is valid")
});

impl DelimiterSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl Segmenter for DelimiterSegmenter {
    fn segment(&self, text: &str, _language_hint: Option<&str>) -> Vec<Sentence> {
        let mut pieces = Vec::new();
        let mut start = 0;

        for delimiter in CLAUSE_DELIMITER.find_iter(text) {
            let end = delimiter.end();
            if end > start {
                pieces.push((start, &text[start..end]));
                start = end;
            }
        }
        if start < text.len() {
            pieces.push((start, &text[start..]));
        }

        merge_whitespace_pieces(text, &pieces)
    }
}

/// Attach whitespace-only pieces to their neighbours so that every sentence
/// carries visible text and the spans stay contiguous.
fn merge_whitespace_pieces(text: &str, pieces: &[(usize, &str)]) -> Vec<Sentence> {
    let mut sentences: Vec<Sentence> = Vec::new();
    let mut leading_start: Option<usize> = None;

    for &(offset, piece) in pieces {
        let end = offset + piece.len();

        if piece.trim().is_empty() {
            match sentences.last_mut() {
                Some(last) => {
                    last.text.push_str(piece);
                    last.end = end;
                }
                None => {
                    leading_start.get_or_insert(offset);
                }
            }
            continue;
        }

        let start = leading_start.take().unwrap_or(offset);
        sentences.push(Sentence {
            start,
            end,
            text: text[start..end].to_string(),
        });
    }

    sentences
}
