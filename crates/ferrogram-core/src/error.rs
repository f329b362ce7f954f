//! Shared error types for the Ferrogram core and transports.

use thiserror::Error;

/// Errors from calls to the upstream Bot API.
///
/// In the long-poll loop all of these are transient: they are logged and
/// answered with a fixed backoff, never surfaced to the caller.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The HTTP request could not be issued or completed.
    #[error("request failed: {0}")]
    Http(String),

    /// The response body was not the expected JSON shape.
    #[error("unable to decode response: {0}")]
    Decode(String),

    /// The service answered with `ok: false`.
    #[error("service rejected request: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors from socket-level transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("unable to bind {addr}: {reason}")]
    Bind {
        /// The configured listen address.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for Bot API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
