//! Error types for the bridge and the histogram decoder.
//!
//! Every failure the bridge can observe is funnelled into
//! [`InvocationFailure`], whose `Display` output is the diagnostic handed to
//! the native caller. Variants wrapping a remote message print it verbatim.

use thiserror::Error;

use crate::histogram::MAX_DENSE_QUBITS;

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for remote client operations.
pub type ClientResult<T> = Result<T, RemoteError>;

/// Result type for configuration lookups.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for a full bridge invocation.
pub type InvocationResult<T> = Result<T, InvocationFailure>;

/// The service returned a measurement distribution that cannot be reshaped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Key contains something other than `'0'` / `'1'`, or is empty.
    #[error("measurement key '{key}' is not a bitstring")]
    InvalidBitstring { key: String },

    /// Key parses, but its value does not fit in `2^num_qubits` slots.
    #[error("measurement key '{key}' is out of range for {num_qubits} qubit(s)")]
    OutOfRange { key: String, num_qubits: u32 },

    /// Two keys resolve to the same histogram slot.
    #[error("measurement keys '{first}' and '{second}' both map to outcome {index}")]
    DuplicateOutcome {
        first: String,
        second: String,
        index: usize,
    },

    /// Dense allocation would exceed the supported register width.
    #[error(
        "cannot build a dense histogram for {0} qubits (limit is {max})",
        max = MAX_DENSE_QUBITS
    )]
    TooManyQubits(u32),

    /// Result document is not shaped like `{"cbits": {bitstring: count}}`.
    #[error("malformed measurement payload: {0}")]
    MalformedPayload(String),
}

/// A failure reported by a [`RemoteJobClient`](crate::RemoteJobClient).
///
/// The message is whatever the service (or client library) said, and is
/// displayed without decoration so it reaches the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// Credentials were rejected.
    #[error("{0}")]
    Authentication(String),

    /// The task could not be scheduled.
    #[error("{0}")]
    Scheduling(String),

    /// The task was scheduled but its results could not be retrieved.
    #[error("{0}")]
    Retrieval(String),

    /// Any other service or transport failure.
    #[error("{0}")]
    Service(String),
}

impl RemoteError {
    /// The raw message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            RemoteError::Authentication(msg)
            | RemoteError::Scheduling(msg)
            | RemoteError::Retrieval(msg)
            | RemoteError::Service(msg) => msg,
        }
    }
}

/// Missing or invalid environment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing configuration: set the {0} environment variable")]
    Missing(&'static str),

    /// The service URL is not an http(s) URL.
    #[error("invalid service URL in {var}: '{value}'")]
    InvalidUrl { var: &'static str, value: String },

    /// Neither the request nor the environment names a device.
    #[error("no device given and {0} is not set")]
    NoDevice(&'static str),
}

/// The single failure channel returned across the bridge boundary.
#[derive(Debug, Error)]
pub enum InvocationFailure {
    /// Environment configuration is missing or invalid.
    #[error("{0}")]
    Configuration(#[from] ConfigError),

    /// Authentication, scheduling, or retrieval failed.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// The service answered with a result that cannot be decoded.
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// The caller passed arguments the bridge refuses to forward.
    #[error("{0}")]
    InvalidRequest(String),

    /// The client panicked; the payload message is preserved.
    #[error("{0}")]
    Panicked(String),

    /// The blocking runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl InvocationFailure {
    /// Diagnostic text for the native caller. Never empty.
    pub fn diagnostic(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            format!("{} failure with no diagnostic message", self.kind())
        } else {
            text
        }
    }

    /// Short category name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InvocationFailure::Configuration(_) => "configuration",
            InvocationFailure::Remote(_) => "remote",
            InvocationFailure::Decode(_) => "decode",
            InvocationFailure::InvalidRequest(_) => "request",
            InvocationFailure::Panicked(_) => "panic",
            InvocationFailure::Runtime(_) => "runtime",
        }
    }
}
