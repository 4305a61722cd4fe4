//! Error taxonomy for model invocation, extraction, and shape validation.
//!
//! Only [`ModelError`] and [`RequestError`] ever leave the crate's public
//! operations. [`ExtractionError`], [`ValidationError`] and [`StageError`]
//! are consumed inside the pipelines, where they advance the cascade.

use std::time::Duration;

use thiserror::Error;

/// A single failed attempt against the remote generator. Always retryable.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("model service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(String),

    #[error("model returned empty content")]
    EmptyContent,
}

/// Failure of a whole model invocation (including its retries).
#[derive(Debug, Error)]
pub enum ModelError {
    /// Missing or placeholder credentials. Never retried.
    #[error("model service is not configured: {0}")]
    Configuration(String),

    /// The caller passed an empty prompt or an out-of-range temperature.
    #[error("invalid model request: {0}")]
    InvalidRequest(String),

    /// Every attempt failed; carries the last transport failure.
    #[error("model service unavailable after {attempts} attempts: {last}")]
    Unavailable {
        attempts: u32,
        #[source]
        last: TransportError,
    },

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}

impl ModelError {
    /// Whether this failure reflects configuration rather than the network.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::InvalidRequest(_))
    }
}

/// No extraction strategy recovered a structured value.
#[derive(Debug, Error)]
#[error("unparsable model output ({})", format_failures(.failures))]
pub struct ExtractionError {
    /// `(strategy name, reason)` for each strategy that was tried.
    pub failures: Vec<(&'static str, String)>,
}

fn format_failures(failures: &[(&'static str, String)]) -> String {
    failures
        .iter()
        .map(|(name, reason)| format!("{name}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A structured value that does not have the shape of a plan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("value is not plan-shaped: {0}")]
    Shape(String),

    #[error("plan has no tasks")]
    NoTasks,

    #[error("task {index} has no subtasks")]
    EmptySubtasks { index: usize },

    #[error("plan has no title")]
    MissingTitle,
}

/// Why one stage of a pipeline did not produce a plan.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("model returned no usable steps")]
    EmptyList,
}

/// A request that fails its declared field constraints.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("{field} must be between {min} and {max} characters (got {actual})")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("{field} must be at least {min} characters (got {actual})")]
    TooShort {
        field: &'static str,
        min: usize,
        actual: usize,
    },

    #[error("invalid mode {0:?} (expected quick or deep)")]
    InvalidMode(String),
}

/// Failure of plan generation from an imported document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to extract a topic from the document: {0}")]
    Model(#[from] ModelError),

    #[error("model returned a blank topic for the document")]
    BlankTopic,
}
