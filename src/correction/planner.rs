/*!
 * Chunk planning.
 *
 * Groups consecutive sentences into chunks bounded by a character budget.
 * The trailing part of each chunk is repeated at the head of the next one so
 * the correction service sees the surrounding context; the overlap is
 * removed again by the reconciler when the corrected chunks are stitched.
 *
 * Overlap rounding: the core/tail boundary sits at `output_fraction` of the
 * chunk's characters and is rounded up to the next sentence start, so the
 * sentence that straddles the boundary belongs to the core.
 */

use log::debug;

use crate::errors::PlanningError;
use crate::segmenter::Sentence;

/// A sentence-aligned slice of the document sent to the correction service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the plan
    pub index: usize,
    /// Every sentence sent to the corrector, in document order
    pub sentences: Vec<Sentence>,
    /// Leading sentences repeated from the previous chunk
    pub overlap_len: usize,
    /// Trailing sentences that the next chunk repeats
    pub tail_len: usize,
}

impl Chunk {
    /// Full chunk text, overlap included
    pub fn text(&self) -> String {
        join(&self.sentences)
    }

    /// Text shared with the tail of the previous chunk
    pub fn overlap_text(&self) -> String {
        join(&self.sentences[..self.overlap_len])
    }

    /// Text that is new relative to the previous chunk
    pub fn core_text(&self) -> String {
        join(&self.sentences[self.overlap_len..])
    }

    /// Text reserved as context for the next chunk
    pub fn tail_text(&self) -> String {
        join(&self.sentences[self.sentences.len() - self.tail_len..])
    }

    /// Length of the overlap in characters
    pub fn overlap_char_len(&self) -> usize {
        self.sentences[..self.overlap_len]
            .iter()
            .map(Sentence::char_len)
            .sum()
    }

    /// Length of the full chunk in characters
    pub fn char_len(&self) -> usize {
        self.sentences.iter().map(Sentence::char_len).sum()
    }

    /// Byte offset of the chunk start in the document
    pub fn start(&self) -> usize {
        self.sentences.first().map(|s| s.start).unwrap_or(0)
    }

    /// Byte offset of the chunk end in the document
    pub fn end(&self) -> usize {
        self.sentences.last().map(|s| s.end).unwrap_or(0)
    }
}

fn join(sentences: &[Sentence]) -> String {
    sentences.iter().map(|s| s.text.as_str()).collect()
}

/// Splits a sentence sequence into overlapping chunks
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    char_limit: usize,
    output_fraction: f64,
}

impl ChunkPlanner {
    /// Create a planner
    ///
    /// # Arguments
    /// * `char_limit` - Maximum characters per chunk (overlap included)
    /// * `output_fraction` - Share of each chunk's characters that is new output, in (0, 1]
    pub fn new(char_limit: usize, output_fraction: f64) -> Result<Self, PlanningError> {
        if char_limit == 0 {
            return Err(PlanningError::InvalidParameters(
                "chunk_char_limit must be greater than zero".to_string(),
            ));
        }
        if !(output_fraction > 0.0 && output_fraction <= 1.0) {
            return Err(PlanningError::InvalidParameters(format!(
                "output_fraction must be in (0, 1], got {}",
                output_fraction
            )));
        }

        Ok(Self {
            char_limit,
            output_fraction,
        })
    }

    pub fn char_limit(&self) -> usize {
        self.char_limit
    }

    pub fn output_fraction(&self) -> f64 {
        self.output_fraction
    }

    /// Plan the chunks for a sentence sequence
    ///
    /// Returns an empty plan for an empty sequence. Fails only when the
    /// sentence spans are malformed.
    pub fn plan(&self, sentences: &[Sentence]) -> Result<Vec<Chunk>, PlanningError> {
        validate_sentences(sentences)?;

        let lengths: Vec<usize> = sentences.iter().map(Sentence::char_len).collect();
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut start = 0;
        let mut previous_end = 0;

        while previous_end < sentences.len() {
            let end = self.extend_chunk(&lengths, start, previous_end);
            let is_last = end == sentences.len();
            let tail_start = if is_last {
                end
            } else {
                self.tail_start(&lengths, start, end)
            };

            let chunk = Chunk {
                index: chunks.len(),
                sentences: sentences[start..end].to_vec(),
                overlap_len: previous_end - start,
                tail_len: end - tail_start,
            };
            debug!(
                "Planned chunk {}: sentences {}..{} ({} chars, overlap {}, tail {})",
                chunk.index,
                start,
                end,
                chunk.char_len(),
                chunk.overlap_len,
                chunk.tail_len
            );
            chunks.push(chunk);

            start = tail_start;
            previous_end = end;
        }

        Ok(chunks)
    }

    /// End index of the chunk starting at `start`
    ///
    /// Always includes at least one sentence past `previous_end`, even if
    /// that sentence alone exceeds the budget.
    fn extend_chunk(&self, lengths: &[usize], start: usize, previous_end: usize) -> usize {
        let mut total: usize = lengths[start..previous_end].iter().sum();
        let mut end = previous_end;

        while end < lengths.len() {
            let next = lengths[end];
            if end > previous_end && total + next > self.char_limit {
                break;
            }
            total += next;
            end += 1;
        }

        end
    }

    /// Index of the first sentence reserved as trailing context
    fn tail_start(&self, lengths: &[usize], start: usize, end: usize) -> usize {
        let total: usize = lengths[start..end].iter().sum();
        let boundary = total as f64 * self.output_fraction;

        let mut offset = lengths[start];
        for (index, length) in lengths.iter().enumerate().take(end).skip(start + 1) {
            if offset as f64 >= boundary {
                return index;
            }
            offset += length;
        }

        end
    }
}

/// Check that spans are well formed, ordered and non-overlapping
pub fn validate_sentences(sentences: &[Sentence]) -> Result<(), PlanningError> {
    let mut previous_end = 0;

    for (index, sentence) in sentences.iter().enumerate() {
        if sentence.end < sentence.start {
            return Err(PlanningError::InvalidSpan {
                index,
                start: sentence.start,
                end: sentence.end,
            });
        }
        if sentence.end - sentence.start != sentence.text.len() {
            return Err(PlanningError::SpanMismatch {
                index,
                expected: sentence.end - sentence.start,
                actual: sentence.text.len(),
            });
        }
        if index > 0 && sentence.start < previous_end {
            return Err(PlanningError::OutOfOrder {
                index,
                start: sentence.start,
                previous_end,
            });
        }
        previous_end = sentence.end;
    }

    Ok(())
}
