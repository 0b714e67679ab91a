//! Error types for the OQC adapter.

use qcounts_core::{ConfigError, RemoteError};
use thiserror::Error;

/// Result type for OQC operations.
pub type OqcResult<T> = Result<T, OqcError>;

/// Errors that can occur when interacting with OQC QCaaS.
#[derive(Debug, Error)]
pub enum OqcError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token or URL missing from the configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// API returned an error response. `message` is the service's own text.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// The service accepted the request but returned no task id.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Task finished in a failed state.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Task was cancelled before completing.
    #[error("Task cancelled: {0}")]
    TaskCancelled(String),

    /// Timeout waiting for task completion.
    #[error("Timeout waiting for task: {0}")]
    Timeout(String),
}

impl OqcError {
    /// Whether the service rejected our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, OqcError::ApiError { status: 401 | 403, .. })
    }
}

impl From<OqcError> for RemoteError {
    fn from(e: OqcError) -> Self {
        match e {
            OqcError::ApiError {
                status: 401 | 403,
                message,
            } => RemoteError::Authentication(message),
            OqcError::TaskFailed(msg) => RemoteError::Retrieval(msg),
            OqcError::TaskCancelled(_) | OqcError::Timeout(_) => {
                RemoteError::Retrieval(e.to_string())
            }
            _ => RemoteError::Service(e.to_string()),
        }
    }
}
