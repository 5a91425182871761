use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The classifier could not produce a label for a request.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring endpoint {endpoint} timed out after {}ms", .timeout.as_millis())]
    Timeout { endpoint: String, timeout: Duration },
    #[error("scoring endpoint {endpoint} is unavailable: {source}")]
    Unavailable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("scoring endpoint {endpoint} answered with HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("scoring endpoint {endpoint} returned a malformed response: {detail}")]
    MalformedResponse { endpoint: String, detail: String },
    #[error("classifier expects {expected} features but the aligned vector has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("classifier failed: {0}")]
    Classifier(String),
}

impl ScoringError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ScoringError::Timeout { .. } | ScoringError::Unavailable { .. } => true,
            ScoringError::Status { status, .. } => *status == 429 || *status >= 500,
            ScoringError::MalformedResponse { .. }
            | ScoringError::DimensionMismatch { .. }
            | ScoringError::Classifier(_) => false,
        }
    }

    /// Whether the failure came from a remote collaborator.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ScoringError::Timeout { .. }
                | ScoringError::Unavailable { .. }
                | ScoringError::Status { .. }
                | ScoringError::MalformedResponse { .. }
        )
    }
}

/// The local model artifact could not be loaded.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("model artifact is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("model artifact is invalid: {0}")]
    Invalid(String),
    #[error("could not build the scoring HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
