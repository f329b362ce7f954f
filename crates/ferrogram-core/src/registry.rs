//! Handler registration and routing table.
//!
//! Handlers are registered on a [`RegistryBuilder`] while the bot is being
//! assembled, then frozen into an immutable [`HandlerRegistry`] snapshot
//! before the fetch loop starts. Dispatch tasks share the snapshot behind an
//! `Arc` and never mutate it, so concurrent lookups need no synchronization.
//!
//! Registration is last-wins: registering a second callback for the same key
//! silently replaces the first.
//!
//! # Message routing
//!
//! A plain message announcing new chat members routes to the
//! new-chat-members handler before any text routing is considered. All
//! other plain messages route on their exact text: a text-specific handler
//! beats the default handler, and an update with neither is silently
//! dropped. Every other kind has a single optional handler slot.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::update::{
    CallbackQuery, ChosenInlineResult, InlineQuery, Message, Poll, PollAnswer, PreCheckoutQuery,
    ShippingQuery,
};

/// A registered callback for payload type `T`.
pub type Handler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Boxes an async closure into the type-erased [`Handler`] form.
fn boxed<T, H, Fut>(handler: H) -> Handler<T>
where
    H: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |payload| Box::pin(handler(payload)))
}

macro_rules! register_slot {
    ($(#[$doc:meta])* $name:ident, $field:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name<H, Fut>(&mut self, handler: H)
        where
            H: Fn($ty) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = ()> + Send + 'static,
        {
            self.$field = Some(boxed(handler));
        }
    };
}

/// Collects handler registrations before the dispatch loop starts.
#[derive(Default)]
pub struct RegistryBuilder {
    message: HashMap<String, Handler<Message>>,
    message_default: Option<Handler<Message>>,
    new_chat_members: Option<Handler<Message>>,
    edited_message: Option<Handler<Message>>,
    channel_post: Option<Handler<Message>>,
    edited_channel_post: Option<Handler<Message>>,
    inline_query: Option<Handler<InlineQuery>>,
    inline_result: Option<Handler<ChosenInlineResult>>,
    callback_query: Option<Handler<CallbackQuery>>,
    shipping_query: Option<Handler<ShippingQuery>>,
    pre_checkout_query: Option<Handler<PreCheckoutQuery>>,
    poll: Option<Handler<Poll>>,
    poll_answer: Option<Handler<PollAnswer>>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for incoming messages whose text equals `text`.
    pub fn on_message<H, Fut>(&mut self, text: impl Into<String>, handler: H)
    where
        H: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.message.insert(text.into(), boxed(handler));
    }

    register_slot!(
        /// Registers the fallback handler for messages without an exact-text match.
        on_message_default, message_default, Message
    );
    register_slot!(
        /// Registers the handler for messages announcing new chat members.
        /// Such messages skip text routing entirely.
        on_new_chat_members, new_chat_members, Message
    );
    register_slot!(
        /// Registers the handler for edited messages.
        on_edited_message, edited_message, Message
    );
    register_slot!(
        /// Registers the handler for channel posts.
        on_channel_post, channel_post, Message
    );
    register_slot!(
        /// Registers the handler for edited channel posts.
        on_edited_channel_post, edited_channel_post, Message
    );
    register_slot!(
        /// Registers the handler for inline queries.
        on_inline_query, inline_query, InlineQuery
    );
    register_slot!(
        /// Registers the handler for chosen inline results.
        on_inline_result, inline_result, ChosenInlineResult
    );
    register_slot!(
        /// Registers the handler for callback queries (inline button presses).
        on_callback_query, callback_query, CallbackQuery
    );
    register_slot!(
        /// Registers the handler for shipping queries.
        on_shipping_query, shipping_query, ShippingQuery
    );
    register_slot!(
        /// Registers the handler for pre-checkout queries.
        on_pre_checkout_query, pre_checkout_query, PreCheckoutQuery
    );
    register_slot!(
        /// Registers the handler for anonymous poll updates.
        on_poll, poll, Poll
    );
    register_slot!(
        /// Registers the handler for non-anonymous poll answers.
        on_poll_answer, poll_answer, PollAnswer
    );

    /// Freezes the collected registrations into an immutable snapshot.
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            message: self.message,
            message_default: self.message_default,
            new_chat_members: self.new_chat_members,
            edited_message: self.edited_message,
            channel_post: self.channel_post,
            edited_channel_post: self.edited_channel_post,
            inline_query: self.inline_query,
            inline_result: self.inline_result,
            callback_query: self.callback_query,
            shipping_query: self.shipping_query,
            pre_checkout_query: self.pre_checkout_query,
            poll: self.poll,
            poll_answer: self.poll_answer,
        }
    }
}

/// Immutable routing table, shared read-only by all dispatch tasks.
pub struct HandlerRegistry {
    message: HashMap<String, Handler<Message>>,
    message_default: Option<Handler<Message>>,
    new_chat_members: Option<Handler<Message>>,
    pub(crate) edited_message: Option<Handler<Message>>,
    pub(crate) channel_post: Option<Handler<Message>>,
    pub(crate) edited_channel_post: Option<Handler<Message>>,
    pub(crate) inline_query: Option<Handler<InlineQuery>>,
    pub(crate) inline_result: Option<Handler<ChosenInlineResult>>,
    pub(crate) callback_query: Option<Handler<CallbackQuery>>,
    pub(crate) shipping_query: Option<Handler<ShippingQuery>>,
    pub(crate) pre_checkout_query: Option<Handler<PreCheckoutQuery>>,
    pub(crate) poll: Option<Handler<Poll>>,
    pub(crate) poll_answer: Option<Handler<PollAnswer>>,
}

impl HandlerRegistry {
    /// Resolves the new-chat-members handler, for messages that actually
    /// carry new members. Checked before [`HandlerRegistry::message_route`];
    /// a member announcement without this handler falls through to text
    /// routing.
    pub fn new_chat_members_route(&self, message: &Message) -> Option<&Handler<Message>> {
        match &message.new_chat_members {
            Some(members) if !members.is_empty() => self.new_chat_members.as_ref(),
            _ => None,
        }
    }

    /// Resolves the handler for a plain message: exact text match first,
    /// then the default handler, else `None`.
    pub fn message_route(&self, text: Option<&str>) -> Option<&Handler<Message>> {
        if let Some(text) = text
            && let Some(handler) = self.message.get(text)
        {
            return Some(handler);
        }
        self.message_default.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::{Chat, User};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn message(text: &str) -> Message {
        Message {
            message_id: 1,
            from: None,
            date: 0,
            chat: Chat {
                id: 1,
                chat_type: "private".to_string(),
                title: None,
                username: None,
                first_name: None,
            },
            text: Some(text.to_string()),
            edit_date: None,
            new_chat_members: None,
        }
    }

    #[tokio::test]
    async fn exact_match_beats_default() {
        let mut builder = RegistryBuilder::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let specific = Arc::clone(&hits);
        builder.on_message("/vote", move |_| {
            let hits = Arc::clone(&specific);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        let fallback = Arc::clone(&hits);
        builder.on_message_default(move |_| {
            let hits = Arc::clone(&fallback);
            async move {
                hits.fetch_add(100, Ordering::SeqCst);
            }
        });
        let registry = builder.build();

        let handler = registry.message_route(Some("/vote")).unwrap();
        handler(message("/vote")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let handler = registry.message_route(Some("/other")).unwrap();
        handler(message("/other")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 101);
    }

    #[test]
    fn member_announcement_outranks_text_route() {
        let mut builder = RegistryBuilder::new();
        builder.on_message("hi", |_| async {});
        builder.on_new_chat_members(|_| async {});
        let registry = builder.build();

        let mut joined = message("hi");
        joined.new_chat_members = Some(vec![User {
            id: 2,
            is_bot: false,
            first_name: "Bea".to_string(),
            last_name: None,
            username: None,
        }]);
        assert!(registry.new_chat_members_route(&joined).is_some());

        // No members present, or an empty list: text routing applies.
        assert!(registry.new_chat_members_route(&message("hi")).is_none());
        let mut empty = message("hi");
        empty.new_chat_members = Some(Vec::new());
        assert!(registry.new_chat_members_route(&empty).is_none());
    }

    #[test]
    fn member_announcement_without_handler_is_not_captured() {
        let mut builder = RegistryBuilder::new();
        builder.on_message_default(|_| async {});
        let registry = builder.build();

        let mut joined = message("hi");
        joined.new_chat_members = Some(vec![User {
            id: 2,
            is_bot: false,
            first_name: "Bea".to_string(),
            last_name: None,
            username: None,
        }]);
        assert!(registry.new_chat_members_route(&joined).is_none());
        assert!(registry.message_route(joined.text.as_deref()).is_some());
    }

    #[test]
    fn no_handlers_routes_to_none() {
        let registry = RegistryBuilder::new().build();
        assert!(registry.message_route(Some("yo")).is_none());
        assert!(registry.message_route(None).is_none());
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut builder = RegistryBuilder::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&hits);
        builder.on_message("/cmd", move |_| {
            let hits = Arc::clone(&first);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        let second = Arc::clone(&hits);
        builder.on_message("/cmd", move |_| {
            let hits = Arc::clone(&second);
            async move {
                hits.fetch_add(10, Ordering::SeqCst);
            }
        });
        let registry = builder.build();

        let handler = registry.message_route(Some("/cmd")).unwrap();
        handler(message("/cmd")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }
}
