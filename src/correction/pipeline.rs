/*!
 * Pipeline driver.
 *
 * Runs segmentation, chunk planning, per-chunk correction and overlap
 * reconciliation in strict chunk order, appending each chunk's new content
 * to a single output buffer. The driver does no I/O of its own; callers
 * observe progress through `PipelineEvent`s and get the finished text in a
 * `PipelineReport`. Any unrecovered failure or cancellation returns an error
 * and discards the partial output.
 */

use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::core::Corrector;
use super::planner::{Chunk, ChunkPlanner};
use super::reconciler::{OverlapReconciler, Reconciliation};
use crate::app_config::Config;
use crate::errors::{CorrectionError, PipelineError};
use crate::segmenter::{Segmenter, UnicodeSegmenter};

/// Characters of the chunk text kept in an issue for locating it
const ISSUE_PREVIEW_CHARS: usize = 60;

/// Immutable settings of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum characters per chunk, overlap included
    pub chunk_char_limit: usize,
    /// Share of each chunk's characters that is new output
    pub output_fraction: f64,
    /// Largest accepted overlap dissimilarity
    pub mismatch_threshold: f64,
    /// Extra attempts after a transient correction failure
    pub retry_count: u32,
    /// Base delay before the first retry, doubled on each further retry
    pub retry_backoff_ms: u64,
    /// Fresh corrections requested when an overlap does not match
    pub regenerate_attempts: u32,
    /// Document language code passed to the segmenter
    pub language: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_char_limit: config.chunking.chunk_char_limit,
            output_fraction: config.chunking.output_fraction,
            mismatch_threshold: config.chunking.mismatch_threshold,
            retry_count: config.correction.common.retry_count,
            retry_backoff_ms: config.correction.common.retry_backoff_ms,
            regenerate_attempts: config.chunking.regenerate_attempts,
            language: config.language.clone(),
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

/// Where the driver is in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Planning,
    /// Correcting chunk i
    PerChunk(usize),
    /// Reconciling and appending chunk i
    Assembling(usize),
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "Planning"),
            Self::PerChunk(index) => write!(f, "PerChunk({})", index),
            Self::Assembling(index) => write!(f, "Assembling({})", index),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// A chunk whose overlap could not be matched with confidence
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationIssue {
    /// Zero-based chunk index
    pub chunk: usize,
    /// Byte offset in the input document where the chunk's new content starts
    pub document_offset: usize,
    /// Dissimilarity of the best boundary found
    pub mismatch: f64,
    /// Threshold the mismatch was compared against
    pub threshold: f64,
    /// Byte offset in the corrected chunk where the kept text starts
    pub boundary: usize,
    /// Regenerations attempted before falling back
    pub regenerations: u32,
    /// Start of the chunk's new content, for locating it in the input
    pub preview: String,
}

impl fmt::Display for ReconciliationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chunk {} (input byte {}): overlap mismatch {:.1}% exceeds {:.1}% after {} regeneration(s), cut at byte {} of the corrected chunk near \"{}\"",
            self.chunk + 1,
            self.document_offset,
            self.mismatch * 100.0,
            self.threshold * 100.0,
            self.regenerations,
            self.boundary,
            self.preview
        )
    }
}

/// Progress notifications emitted during a run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The document was segmented and planned
    Planned { sentences: usize, chunks: usize },
    /// Correction of a chunk is starting
    ChunkStarted { index: usize, total: usize },
    /// A transient failure will be retried after `delay`
    ChunkRetry {
        index: usize,
        attempt: u32,
        delay: Duration,
        error: CorrectionError,
    },
    /// A chunk's new content was appended to the output
    ChunkCompleted {
        index: usize,
        total: usize,
        appended: usize,
        output_len: usize,
    },
    /// A chunk was stitched with the fallback boundary
    LowConfidence(ReconciliationIssue),
    /// All chunks were assembled
    Finished { chunks: usize, elapsed: Duration },
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// The corrected document
    pub output: String,
    /// Number of chunks planned and corrected
    pub chunk_count: usize,
    /// Low-confidence reconciliations, in chunk order
    pub issues: Vec<ReconciliationIssue>,
    /// Transient failures that were retried
    pub retries: u32,
    /// Extra corrections requested for unmatched overlaps
    pub regenerations: u32,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Shared flag used to stop a run between chunks
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sequential chunk correction driver
#[derive(Debug)]
pub struct CorrectionPipeline {
    segmenter: Arc<dyn Segmenter>,
    planner: ChunkPlanner,
    reconciler: OverlapReconciler,
    corrector: Arc<dyn Corrector>,
    options: PipelineOptions,
    cancellation: CancellationFlag,
}

impl CorrectionPipeline {
    /// Create a pipeline using the UAX #29 segmenter
    ///
    /// Fails with a planning error when the chunking options are out of range.
    pub fn new(corrector: Arc<dyn Corrector>, options: PipelineOptions) -> Result<Self, PipelineError> {
        let segmenter: Arc<dyn Segmenter> = Arc::new(UnicodeSegmenter::new());
        let planner = ChunkPlanner::new(options.chunk_char_limit, options.output_fraction)?;
        let reconciler = OverlapReconciler::new(Arc::clone(&segmenter), options.mismatch_threshold)
            .with_language_hint(options.language.clone());

        Ok(Self {
            segmenter,
            planner,
            reconciler,
            corrector,
            options,
            cancellation: CancellationFlag::new(),
        })
    }

    /// Use a different segmenter for planning and reconciliation
    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.reconciler = OverlapReconciler::new(Arc::clone(&segmenter), self.options.mismatch_threshold)
            .with_language_hint(self.options.language.clone());
        self.segmenter = segmenter;
        self
    }

    /// Share a cancellation flag with the caller
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Segment and plan a document without correcting it
    pub fn plan(&self, document: &str) -> Result<Vec<Chunk>, PipelineError> {
        let sentences = self.segmenter.segment(document, self.options.language.as_deref());
        Ok(self.planner.plan(&sentences)?)
    }

    /// Correct a whole document
    ///
    /// # Arguments
    /// * `document` - The input text
    /// * `on_event` - Called for every progress event, in order
    ///
    /// # Returns
    /// * The assembled output and run statistics, or the error that stopped the run
    pub async fn run<F>(&self, document: &str, mut on_event: F) -> Result<PipelineReport, PipelineError>
    where
        F: FnMut(&PipelineEvent) + Send,
    {
        let start_time = Instant::now();
        let mut state = PipelineState::Planning;
        debug!("Pipeline state: {}", state);

        let sentences = self.segmenter.segment(document, self.options.language.as_deref());
        let chunks = self.planner.plan(&sentences)?;
        let total = chunks.len();
        info!(
            "Planned {} chunk(s) from {} sentence(s) ({} chars)",
            total,
            sentences.len(),
            document.chars().count()
        );
        on_event(&PipelineEvent::Planned {
            sentences: sentences.len(),
            chunks: total,
        });

        let mut output = String::with_capacity(document.len());
        let mut issues = Vec::new();
        let mut retries = 0;
        let mut regenerations = 0;

        for chunk in &chunks {
            self.check_cancelled(chunk.index, total)?;
            advance(&mut state, PipelineState::PerChunk(chunk.index));
            on_event(&PipelineEvent::ChunkStarted {
                index: chunk.index,
                total,
            });

            let corrected = self
                .correct_with_retry(chunk, total, &mut on_event, &mut retries)
                .await?;

            advance(&mut state, PipelineState::Assembling(chunk.index));
            let suffix = if chunk.overlap_len == 0 {
                corrected
            } else {
                let previous_tail = tail_chars(&output, chunk.overlap_char_len());
                let mut reconciliation =
                    self.reconciler
                        .reconcile(previous_tail, &corrected, chunk.overlap_char_len());

                let mut attempts = 0;
                while !reconciliation.matched && attempts < self.options.regenerate_attempts {
                    self.check_cancelled(chunk.index, total)?;
                    attempts += 1;
                    regenerations += 1;
                    info!(
                        "Chunk {}/{}: overlap mismatch {:.1}%, regenerating ({}/{})",
                        chunk.index + 1,
                        total,
                        reconciliation.mismatch() * 100.0,
                        attempts,
                        self.options.regenerate_attempts
                    );
                    match self.regenerate(chunk, previous_tail).await {
                        Ok(candidate) => {
                            if candidate.matched || candidate.score > reconciliation.score {
                                reconciliation = candidate;
                            }
                        }
                        Err(e) => {
                            warn!("Chunk {}: regeneration failed: {}", chunk.index + 1, e);
                            break;
                        }
                    }
                }

                if !reconciliation.matched {
                    let issue = self.issue_for(chunk, &reconciliation, attempts);
                    warn!("Low-confidence reconciliation: {}", issue);
                    on_event(&PipelineEvent::LowConfidence(issue.clone()));
                    issues.push(issue);
                }
                reconciliation.suffix
            };

            output.push_str(&suffix);
            on_event(&PipelineEvent::ChunkCompleted {
                index: chunk.index,
                total,
                appended: suffix.chars().count(),
                output_len: output.len(),
            });
        }

        advance(&mut state, PipelineState::Done);
        let elapsed = start_time.elapsed();
        on_event(&PipelineEvent::Finished {
            chunks: total,
            elapsed,
        });

        Ok(PipelineReport {
            output,
            chunk_count: total,
            issues,
            retries,
            regenerations,
            elapsed,
        })
    }

    /// Correct one chunk, retrying transient failures with exponential backoff
    async fn correct_with_retry<F>(
        &self,
        chunk: &Chunk,
        total: usize,
        on_event: &mut F,
        retries: &mut u32,
    ) -> Result<String, PipelineError>
    where
        F: FnMut(&PipelineEvent) + Send,
    {
        let text = chunk.text();
        let max_attempts = self.options.retry_count.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.corrector.correct(&text).await {
                Ok(corrected) => return Ok(corrected),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.options.backoff(attempt);
                    warn!(
                        "Chunk {}/{}: attempt {}/{} failed: {}. Retrying in {}ms",
                        chunk.index + 1,
                        total,
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );
                    on_event(&PipelineEvent::ChunkRetry {
                        index: chunk.index,
                        attempt,
                        delay,
                        error: e,
                    });
                    *retries += 1;
                    tokio::time::sleep(delay).await;
                    self.check_cancelled(chunk.index, total)?;
                }
                Err(e) => {
                    return Err(PipelineError::CorrectionFailed {
                        chunk: chunk.index,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    /// Request a fresh correction and reconcile it, without retries
    async fn regenerate(&self, chunk: &Chunk, previous_tail: &str) -> Result<Reconciliation, CorrectionError> {
        let corrected = self.corrector.correct(&chunk.text()).await?;
        Ok(self
            .reconciler
            .reconcile(previous_tail, &corrected, chunk.overlap_char_len()))
    }

    fn issue_for(&self, chunk: &Chunk, reconciliation: &Reconciliation, regenerations: u32) -> ReconciliationIssue {
        let document_offset = chunk
            .sentences
            .get(chunk.overlap_len)
            .map(|s| s.start)
            .unwrap_or_else(|| chunk.end());

        ReconciliationIssue {
            chunk: chunk.index,
            document_offset,
            mismatch: reconciliation.mismatch(),
            threshold: self.reconciler.mismatch_threshold(),
            boundary: reconciliation.boundary,
            regenerations,
            preview: chunk
                .core_text()
                .chars()
                .take(ISSUE_PREVIEW_CHARS)
                .map(|c| if c.is_whitespace() { ' ' } else { c })
                .collect(),
        }
    }

    fn check_cancelled(&self, completed: usize, total: usize) -> Result<(), PipelineError> {
        if self.cancellation.is_cancelled() {
            warn!("Correction cancelled after {} of {} chunks", completed, total);
            return Err(PipelineError::Cancelled { completed, total });
        }
        Ok(())
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug!("Pipeline state: {} -> {}", state, next);
    *state = next;
}

/// The last `chars` characters of `text`
fn tail_chars(text: &str, chars: usize) -> &str {
    if chars == 0 {
        return "";
    }
    match text.char_indices().rev().nth(chars - 1) {
        Some((offset, _)) => &text[offset..],
        None => text,
    }
}
