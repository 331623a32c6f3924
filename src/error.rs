//! Error taxonomy for the evaluation pipeline.
//!
//! Stage-internal failures are captured into `WorkflowState::error` rather
//! than propagated; the types here classify what went wrong so callers can
//! decide between abort and retry.

use thiserror::Error;

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum GradeflowError {
    /// Malformed or missing document input. Fatal to the workflow instance.
    #[error("input error: {0}")]
    Input(String),

    /// Unsupported or unreadable document. Fatal to the workflow instance.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// An oracle call failed for a specific question. Recovered locally as a
    /// degraded placeholder evaluation, never fatal to the whole batch.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// An entity invariant was violated at construction time.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown workflow id. Surfaced to the caller, no mutation.
    #[error("workflow not found: {0}")]
    NotFound(String),
}

/// Document extraction failures.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported document format: {format}")]
    UnsupportedFormat { format: String },

    #[error("failed to read document {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Evaluation oracle failures.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("oracle returned HTTP {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("oracle response could not be parsed: {0}")]
    MalformedResponse(String),

    #[error("oracle call timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Entity invariant violations. Rejected at construction, never coerced.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty or whitespace")]
    EmptyField { field: &'static str },

    #[error("max_score must be positive, got {value}")]
    NonPositiveMaxScore { value: f64 },

    #[error("confidence must be within 0.0..=1.0, got {value}")]
    ConfidenceOutOfRange { value: f64 },

    #[error("score must be non-negative, got {value}")]
    NegativeScore { value: f64 },
}

/// Convenience alias used by the workflow driver.
pub type Result<T> = std::result::Result<T, GradeflowError>;
