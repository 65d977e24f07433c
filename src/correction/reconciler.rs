/*!
 * Overlap reconciliation.
 *
 * A corrected chunk starts with a (possibly reworded) copy of text that is
 * already at the end of the assembled output. The reconciler scores every
 * sentence or clause boundary of the corrected chunk by how well the prefix
 * before it matches the assembled tail, and keeps only what follows the best
 * boundary. When no boundary is similar enough it falls back to the overlap
 * length declared by the planner and reports the match as low confidence.
 */

use log::{debug, trace};
use std::sync::Arc;

use super::similarity::SequenceMatcher;
use crate::segmenter::{DelimiterSegmenter, Segmenter};

/// Floating point slack when comparing a mismatch against the threshold
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Outcome of reconciling one corrected chunk
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Text to append to the assembled output
    pub suffix: String,
    /// Whether a boundary cleared the mismatch threshold
    pub matched: bool,
    /// Byte offset in the corrected chunk where the suffix starts
    pub boundary: usize,
    /// Similarity of the best boundary found, in [0, 1]
    pub score: f64,
}

impl Reconciliation {
    /// Dissimilarity of the best boundary found, in [0, 1]
    pub fn mismatch(&self) -> f64 {
        1.0 - self.score
    }
}

/// Strips repeated overlap from corrected chunks
#[derive(Debug, Clone)]
pub struct OverlapReconciler {
    segmenter: Arc<dyn Segmenter>,
    fallback: DelimiterSegmenter,
    mismatch_threshold: f64,
    language_hint: Option<String>,
}

impl OverlapReconciler {
    /// Create a reconciler
    ///
    /// # Arguments
    /// * `segmenter` - Used to find candidate boundaries in corrected text
    /// * `mismatch_threshold` - Largest accepted dissimilarity, clamped to [0, 1]
    pub fn new(segmenter: Arc<dyn Segmenter>, mismatch_threshold: f64) -> Self {
        Self {
            segmenter,
            fallback: DelimiterSegmenter::new(),
            mismatch_threshold: mismatch_threshold.clamp(0.0, 1.0),
            language_hint: None,
        }
    }

    /// Set the language hint passed to the segmenter
    pub fn with_language_hint(mut self, language_hint: Option<String>) -> Self {
        self.language_hint = language_hint;
        self
    }

    pub fn mismatch_threshold(&self) -> f64 {
        self.mismatch_threshold
    }

    /// Byte offsets in `corrected` where the repeated overlap may end
    ///
    /// Sentence ends merged with clause delimiter ends. A corrector may join
    /// the last overlap sentence to the next one with a comma, leaving the
    /// true overlap end visible only at clause level.
    pub fn candidate_boundaries(&self, corrected: &str) -> Vec<usize> {
        let sentences = self
            .segmenter
            .segment(corrected, self.language_hint.as_deref());
        let clauses = self.fallback.segment(corrected, None);

        let mut boundaries: Vec<usize> = sentences
            .iter()
            .chain(clauses.iter())
            .map(|s| s.end)
            .filter(|&end| end > 0 && end <= corrected.len() && corrected.is_char_boundary(end))
            .collect();

        boundaries.sort_unstable();
        boundaries.dedup();
        boundaries
    }

    /// Remove the repeated overlap from a corrected chunk
    ///
    /// # Arguments
    /// * `previous_tail` - Trailing text of the assembled output the chunk repeats
    /// * `corrected_chunk` - The corrector's output for the whole chunk
    /// * `declared_overlap_chars` - Overlap length from planning, used as fallback
    pub fn reconcile(
        &self,
        previous_tail: &str,
        corrected_chunk: &str,
        declared_overlap_chars: usize,
    ) -> Reconciliation {
        if previous_tail.is_empty() {
            return Reconciliation {
                suffix: corrected_chunk.to_string(),
                matched: true,
                boundary: 0,
                score: 1.0,
            };
        }

        let candidates = self.candidate_boundaries(corrected_chunk);
        let tail = previous_tail.trim_end();
        let mut best: Option<(usize, f64)> = None;

        for &boundary in &candidates {
            let matcher = SequenceMatcher::new(tail, corrected_chunk[..boundary].trim_end());
            if let Some((_, best_score)) = best {
                if matcher.real_quick_ratio() <= best_score || matcher.quick_ratio() <= best_score {
                    continue;
                }
            }

            let score = matcher.ratio();
            trace!("Boundary {} scored {:.4}", boundary, score);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((boundary, score));
            }
        }

        let (best_boundary, best_score) = best.unwrap_or((0, 0.0));
        if 1.0 - best_score <= self.mismatch_threshold + THRESHOLD_EPSILON {
            debug!(
                "Overlap matched at byte {} (similarity {:.4})",
                best_boundary, best_score
            );
            return Reconciliation {
                suffix: corrected_chunk[best_boundary..].to_string(),
                matched: true,
                boundary: best_boundary,
                score: best_score,
            };
        }

        let boundary = fallback_boundary(corrected_chunk, declared_overlap_chars, &candidates);
        debug!(
            "Best overlap similarity {:.4} misses threshold {:.4}, using declared overlap (byte {})",
            best_score,
            1.0 - self.mismatch_threshold,
            boundary
        );
        Reconciliation {
            suffix: corrected_chunk[boundary..].to_string(),
            matched: false,
            boundary,
            score: best_score,
        }
    }
}

/// Byte offset after `overlap_chars` characters, snapped back to the last
/// candidate boundary at or before it, or forward when there is none.
fn fallback_boundary(text: &str, overlap_chars: usize, candidates: &[usize]) -> usize {
    let raw = text
        .char_indices()
        .nth(overlap_chars)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());

    candidates
        .iter()
        .copied()
        .filter(|&candidate| candidate <= raw)
        .max()
        .or_else(|| candidates.iter().copied().find(|&candidate| candidate > raw))
        .unwrap_or(raw)
}
