/*!
 * Chunked correction of long documents.
 *
 * This module contains the chunking and overlap-reconciliation pipeline.
 * It is split into several submodules:
 *
 * - `planner`: Groups sentences into overlapping chunks
 * - `similarity`: Sequence alignment ratio used to compare overlaps
 * - `reconciler`: Strips the repeated overlap from corrected chunks
 * - `core`: Correction client trait and provider-backed service
 * - `pipeline`: Drives planning, correction and assembly
 */

// Re-export main types for easier usage
pub use self::core::{CorrectionService, Corrector};
pub use self::pipeline::{
    CancellationFlag, CorrectionPipeline, PipelineEvent, PipelineOptions, PipelineReport,
    PipelineState, ReconciliationIssue,
};
pub use self::planner::{Chunk, ChunkPlanner};
pub use self::reconciler::{OverlapReconciler, Reconciliation};
pub use self::similarity::{SequenceMatcher, similarity_ratio};

// Submodules
pub mod core;
pub mod pipeline;
pub mod planner;
pub mod reconciler;
pub mod similarity;
