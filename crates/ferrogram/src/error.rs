//! Startup error taxonomy.
//!
//! Only *startup* fails loudly. Once a bot is running, fetch failures are
//! retried inside the poll loop and handler failures are the handler's own
//! problem; neither surfaces here.

use thiserror::Error;

use ferrogram_core::{ApiError, TransportError};

/// Why a bot failed to start.
#[derive(Debug, Error)]
pub enum StartError {
    /// The configured token is empty.
    #[error("no bot token configured")]
    MissingToken,

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// `setWebhook` was rejected or unreachable.
    #[error("webhook registration failed: {0}")]
    WebhookRegistration(#[source] ApiError),

    /// The webhook listener could not be set up.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configured mode's cargo feature is not compiled in.
    #[error("transport mode not compiled in: enable the `{0}` feature")]
    ModeUnavailable(&'static str),
}

/// Result type for bot startup.
pub type StartResult<T> = Result<T, StartError>;
