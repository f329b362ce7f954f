//! # Ferrogram Transport
//!
//! Update acquisition for the Ferrogram bot framework: how decoded
//! [`Update`](ferrogram_core::Update) batches get from the service into the
//! dispatcher in `ferrogram-core`.
//!
//! Two mutually exclusive modes, each behind a feature:
//!
//! - `long-poll` — [`poller::Poller`] drives blocking `getUpdates` requests
//!   through [`api::ApiClient`], tracking the acknowledgement offset.
//! - `webhook` — [`webhook::WebhookListener`] accepts pushed updates over
//!   HTTP after the facade registers the URL via `setWebhook`.
//!
//! Neither feature is on by default; the `ferrogram` facade crate enables
//! both and picks a mode from its configuration.

#[cfg(any(feature = "long-poll", feature = "webhook"))]
pub mod api;
#[cfg(feature = "long-poll")]
pub mod poller;
#[cfg(feature = "webhook")]
pub mod webhook;

#[cfg(any(feature = "long-poll", feature = "webhook"))]
pub use api::{API_BASE_URL, ApiClient, ApiResponse, UpdateSource};
#[cfg(feature = "long-poll")]
pub use poller::{OffsetTracker, POLL_TIMEOUT_SECS, Poller, RETRY_DELAY};
#[cfg(feature = "webhook")]
pub use webhook::{UpdateSink, WebhookListener};
