//! Concurrent update dispatch.
//!
//! Every update in a batch is dispatched on its own task: updates of one
//! batch run in parallel with each other *and* with the next fetch
//! iteration, and nothing waits for a handler to finish (fire-and-forget).
//! There is deliberately no ordering guarantee, even inside one batch.
//!
//! The only bound is a semaphore sizing the number of concurrently *running*
//! handlers, so a pathologically large batch cannot grow tasks without
//! limit. Handler outcomes are not observed: a failing handler is the
//! handler's own problem.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::registry::{Handler, HandlerRegistry};
use crate::update::{Update, UpdateKind, UpdatePayload};

/// Default cap on concurrently running handlers.
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Routes updates to their registered handlers, one task per update.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    /// Creates a dispatcher with [`DEFAULT_CONCURRENCY`].
    pub fn new(registry: HandlerRegistry) -> Self {
        Self::with_concurrency(registry, DEFAULT_CONCURRENCY)
    }

    /// Creates a dispatcher capping concurrently running handlers at
    /// `max_concurrency`.
    pub fn with_concurrency(registry: HandlerRegistry, max_concurrency: usize) -> Self {
        Self {
            registry: Arc::new(registry),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Dispatches every update of a batch independently and concurrently.
    ///
    /// Returns as soon as all tasks are spawned; must be called from within
    /// a tokio runtime.
    pub fn dispatch_batch(&self, batch: Vec<Update>) {
        for update in batch {
            self.dispatch(update);
        }
    }

    /// Dispatches a single update on its own task.
    pub fn dispatch(&self, update: Update) {
        let registry = Arc::clone(&self.registry);
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only fails if the
            // runtime is tearing down.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            run_update(&registry, update).await;
        });
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

/// Classifies one update and invokes the matching handler, if any.
async fn run_update(registry: &HandlerRegistry, update: Update) {
    let update_id = update.update_id;
    let Some(payload) = update.payload else {
        debug!(update_id, "update carries no known payload, dropping");
        return;
    };

    match payload {
        UpdatePayload::Message(m) => {
            // Member announcements outrank text routing.
            if let Some(handler) = registry.new_chat_members_route(&m) {
                handler(m).await;
                return;
            }
            match registry.message_route(m.text.as_deref()) {
                Some(handler) => handler(m).await,
                None => debug!(update_id, kind = %UpdateKind::Message, "no handler registered, dropping update"),
            }
        }
        UpdatePayload::EditedMessage(m) => invoke(&registry.edited_message, m, update_id).await,
        UpdatePayload::ChannelPost(m) => invoke(&registry.channel_post, m, update_id).await,
        UpdatePayload::EditedChannelPost(m) => {
            invoke(&registry.edited_channel_post, m, update_id).await;
        }
        UpdatePayload::InlineQuery(q) => invoke(&registry.inline_query, q, update_id).await,
        UpdatePayload::ChosenInlineResult(r) => invoke(&registry.inline_result, r, update_id).await,
        UpdatePayload::CallbackQuery(q) => invoke(&registry.callback_query, q, update_id).await,
        UpdatePayload::ShippingQuery(q) => invoke(&registry.shipping_query, q, update_id).await,
        UpdatePayload::PreCheckoutQuery(q) => {
            invoke(&registry.pre_checkout_query, q, update_id).await;
        }
        UpdatePayload::Poll(p) => invoke(&registry.poll, p, update_id).await,
        UpdatePayload::PollAnswer(a) => invoke(&registry.poll_answer, a, update_id).await,
    }
}

/// Invokes the slot handler, or drops the payload with a debug log.
/// Dropping is steady-state for unhandled kinds, not an error.
async fn invoke<T>(handler: &Option<Handler<T>>, payload: T, update_id: i64) {
    match handler {
        Some(handler) => handler(payload).await,
        None => debug!(update_id, "no handler registered, dropping update"),
    }
}
