/*!
 * Error types for the textfix application.
 *
 * This module contains custom error types for the different stages of a
 * correction run, using the thiserror crate for ergonomic error definitions.
 * Fatal errors stop the pipeline; low-confidence reconciliations are not
 * errors and are reported through `ReconciliationIssue` instead.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether the same request may succeed if sent again later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 408,
            Self::AuthenticationError(_) => false,
        }
    }
}

/// Malformed segmentation input or planning parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// A sentence span ends before it starts
    #[error("Sentence {index} has an invalid span {start}..{end}")]
    InvalidSpan {
        index: usize,
        start: usize,
        end: usize,
    },

    /// A sentence span starts before the previous one ended
    #[error("Sentence {index} starts at {start} but the previous sentence ends at {previous_end}")]
    OutOfOrder {
        index: usize,
        start: usize,
        previous_end: usize,
    },

    /// The span text does not match its declared length
    #[error("Sentence {index} text is {actual} bytes long but its span covers {expected}")]
    SpanMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// Chunking parameters out of range
    #[error("Invalid chunking parameters: {0}")]
    InvalidParameters(String),
}

/// Failure of the correction collaborator for one chunk
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrectionError {
    /// Collaborator temporarily unavailable; the same input may be retried
    #[error("Correction service temporarily unavailable: {0}")]
    Transient(String),

    /// Collaborator permanently failed for this input
    #[error("Correction service failed: {0}")]
    Fatal(String),
}

impl CorrectionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<ProviderError> for CorrectionError {
    fn from(error: ProviderError) -> Self {
        if error.is_retryable() {
            Self::Transient(error.to_string())
        } else {
            Self::Fatal(error.to_string())
        }
    }
}

/// Errors that abort a correction run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The document could not be planned into chunks
    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    /// A chunk could not be corrected
    #[error("Chunk {chunk} could not be corrected after {attempts} attempt(s): {source}")]
    CorrectionFailed {
        /// Zero-based chunk index
        chunk: usize,
        /// Number of attempts made for the chunk
        attempts: u32,
        /// Last error reported by the corrector
        source: CorrectionError,
    },

    /// The run was cancelled before all chunks were assembled
    #[error("Correction cancelled after {completed} of {total} chunks")]
    Cancelled { completed: usize, total: usize },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the correction pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
