//! # Ferrogram Core
//!
//! The update model and dispatch engine of the Ferrogram bot framework.
//!
//! This crate is transport-agnostic: it knows nothing about long-polling or
//! webhooks, only about decoded [`Update`]s and how to route them. The
//! transports in `ferrogram-transport` produce batches of updates; this
//! crate classifies each one and fans it out to registered handlers.
//!
//! ```text
//! ┌────────────────┐   batch    ┌────────────┐  per update   ┌─────────┐
//! │ Transport      │───────────▶│ Dispatcher │──────────────▶│ Handler │
//! │ (poll/webhook) │            │  (spawn)   │──────────────▶│ Handler │
//! └────────────────┘            └────────────┘               └─────────┘
//! ```
//!
//! - [`update`] — the `Update` sum type, its payload objects, and the wire
//!   decoding that classifies each update into exactly one kind.
//! - [`registry`] — handler registration (builder) frozen into an immutable
//!   routing snapshot before dispatch starts.
//! - [`dispatcher`] — one concurrent, fire-and-forget task per update,
//!   bounded by a semaphore.
//! - [`error`] — the shared `ApiError`/`TransportError` taxonomy used by the
//!   transport crates.

pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod update;

pub use dispatcher::{DEFAULT_CONCURRENCY, Dispatcher};
pub use error::{ApiError, ApiResult, TransportError, TransportResult};
pub use registry::{Handler, HandlerRegistry, RegistryBuilder};
pub use update::{
    CallbackQuery, Chat, ChosenInlineResult, InlineQuery, Message, Poll, PollAnswer, PollOption,
    PreCheckoutQuery, ShippingAddress, ShippingQuery, Update, UpdateKind, UpdatePayload, User,
};
