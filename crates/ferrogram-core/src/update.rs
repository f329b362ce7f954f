//! Telegram update model.
//!
//! The wire shape of an update is an object with an `update_id` and *at most
//! one* of eleven payload fields (`message`, `edited_message`, ...). Instead
//! of mirroring that as a struct full of `Option`s, the payload is decoded
//! into the [`UpdatePayload`] sum type, so downstream routing is a
//! compile-time-exhaustive match.
//!
//! # Classification
//!
//! A custom `Deserialize` impl performs the classification during decoding:
//! the first populated field wins, in the fixed order listed on
//! [`UpdateKind`]. The order only matters as a disambiguation policy for
//! the (out-of-contract) case where the service populates more than one
//! field. An update carrying none of the known fields decodes with
//! `payload: None`; it still participates in offset acknowledgement and is
//! dropped at dispatch with a debug log, so a newer API kind can never wedge
//! the fetch loop.

use serde::{Deserialize, Serialize};
use serde::ser::SerializeStruct;

// ============================================================================
// Shared object types
// ============================================================================

/// A Telegram user or bot account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// A private, group, supergroup or channel chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

/// An incoming message, edited message or channel post.
///
/// `chat.id` and `message_id` together are the correlation identifiers
/// application code keys its own state on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub date: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub edit_date: Option<i64>,
    pub new_chat_members: Option<Vec<User>>,
}

/// An incoming inline query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    pub query: String,
    pub offset: String,
}

/// An inline result the user picked from a previous inline query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    pub result_id: String,
    pub from: User,
    pub query: String,
    pub inline_message_id: Option<String>,
}

/// A callback from an inline keyboard button press.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub inline_message_id: Option<String>,
    pub data: Option<String>,
}

/// A shipping address attached to a shipping query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub country_code: String,
    pub state: String,
    pub city: String,
    pub street_line1: String,
    pub street_line2: String,
    pub post_code: String,
}

/// An incoming shipping query from an invoice with flexible pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingQuery {
    pub id: String,
    pub from: User,
    pub invoice_payload: String,
    pub shipping_address: ShippingAddress,
}

/// An incoming pre-checkout query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    pub id: String,
    pub from: User,
    pub currency: String,
    pub total_amount: i64,
    pub invoice_payload: String,
}

/// One answer option in a poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub voter_count: i64,
}

/// An anonymous poll state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub is_closed: bool,
}

/// A vote change in a non-anonymous poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollAnswer {
    pub poll_id: String,
    pub user: User,
    #[serde(default)]
    pub option_ids: Vec<i64>,
}

// ============================================================================
// Update
// ============================================================================

/// Discriminant of an [`UpdatePayload`].
///
/// Variant order is the classification priority used when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    InlineQuery,
    ChosenInlineResult,
    CallbackQuery,
    ShippingQuery,
    PreCheckoutQuery,
    Poll,
    PollAnswer,
}

impl UpdateKind {
    /// Wire-format field name for this kind, used for routing logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::EditedMessage => "edited_message",
            Self::ChannelPost => "channel_post",
            Self::EditedChannelPost => "edited_channel_post",
            Self::InlineQuery => "inline_query",
            Self::ChosenInlineResult => "chosen_inline_result",
            Self::CallbackQuery => "callback_query",
            Self::ShippingQuery => "shipping_query",
            Self::PreCheckoutQuery => "pre_checkout_query",
            Self::Poll => "poll",
            Self::PollAnswer => "poll_answer",
        }
    }
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single active payload of an [`Update`].
#[derive(Debug, Clone)]
pub enum UpdatePayload {
    Message(Message),
    EditedMessage(Message),
    ChannelPost(Message),
    EditedChannelPost(Message),
    InlineQuery(InlineQuery),
    ChosenInlineResult(ChosenInlineResult),
    CallbackQuery(CallbackQuery),
    ShippingQuery(ShippingQuery),
    PreCheckoutQuery(PreCheckoutQuery),
    Poll(Poll),
    PollAnswer(PollAnswer),
}

impl UpdatePayload {
    /// Returns the kind of this payload.
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Message(_) => UpdateKind::Message,
            Self::EditedMessage(_) => UpdateKind::EditedMessage,
            Self::ChannelPost(_) => UpdateKind::ChannelPost,
            Self::EditedChannelPost(_) => UpdateKind::EditedChannelPost,
            Self::InlineQuery(_) => UpdateKind::InlineQuery,
            Self::ChosenInlineResult(_) => UpdateKind::ChosenInlineResult,
            Self::CallbackQuery(_) => UpdateKind::CallbackQuery,
            Self::ShippingQuery(_) => UpdateKind::ShippingQuery,
            Self::PreCheckoutQuery(_) => UpdateKind::PreCheckoutQuery,
            Self::Poll(_) => UpdateKind::Poll,
            Self::PollAnswer(_) => UpdateKind::PollAnswer,
        }
    }
}

/// One event delivered by the upstream service, tagged with exactly one
/// payload kind.
///
/// `update_id` is the monotonically increasing sequence identifier assigned
/// by the service; the long-poll cursor is derived from it.
#[derive(Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    /// The active payload, or `None` for an update of a kind this build does
    /// not know about.
    pub payload: Option<UpdatePayload>,
}

impl Update {
    /// Classifies this update: its active kind plus the routing sub-key
    /// (the exact message text, for plain messages).
    ///
    /// Pure and deterministic; the same update always classifies the same.
    pub fn classify(&self) -> Option<(UpdateKind, Option<&str>)> {
        let payload = self.payload.as_ref()?;
        let sub_key = match payload {
            UpdatePayload::Message(m) => m.text.as_deref(),
            _ => None,
        };
        Some((payload.kind(), sub_key))
    }

    /// Returns the kind of the active payload, if known.
    pub fn kind(&self) -> Option<UpdateKind> {
        self.payload.as_ref().map(UpdatePayload::kind)
    }
}

// ============================================================================
// Wire conversion
// ============================================================================

/// The raw wire shape: `update_id` plus at most one populated payload field.
#[derive(Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<Message>,
    edited_message: Option<Message>,
    channel_post: Option<Message>,
    edited_channel_post: Option<Message>,
    inline_query: Option<InlineQuery>,
    chosen_inline_result: Option<ChosenInlineResult>,
    callback_query: Option<CallbackQuery>,
    shipping_query: Option<ShippingQuery>,
    pre_checkout_query: Option<PreCheckoutQuery>,
    poll: Option<Poll>,
    poll_answer: Option<PollAnswer>,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        // First populated field wins, in UpdateKind order.
        let payload = if let Some(m) = raw.message {
            Some(UpdatePayload::Message(m))
        } else if let Some(m) = raw.edited_message {
            Some(UpdatePayload::EditedMessage(m))
        } else if let Some(m) = raw.channel_post {
            Some(UpdatePayload::ChannelPost(m))
        } else if let Some(m) = raw.edited_channel_post {
            Some(UpdatePayload::EditedChannelPost(m))
        } else if let Some(q) = raw.inline_query {
            Some(UpdatePayload::InlineQuery(q))
        } else if let Some(r) = raw.chosen_inline_result {
            Some(UpdatePayload::ChosenInlineResult(r))
        } else if let Some(q) = raw.callback_query {
            Some(UpdatePayload::CallbackQuery(q))
        } else if let Some(q) = raw.shipping_query {
            Some(UpdatePayload::ShippingQuery(q))
        } else if let Some(q) = raw.pre_checkout_query {
            Some(UpdatePayload::PreCheckoutQuery(q))
        } else if let Some(p) = raw.poll {
            Some(UpdatePayload::Poll(p))
        } else {
            raw.poll_answer.map(UpdatePayload::PollAnswer)
        };

        Self {
            update_id: raw.update_id,
            payload,
        }
    }
}

impl<'de> Deserialize<'de> for Update {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        RawUpdate::deserialize(deserializer).map(Update::from)
    }
}

impl Serialize for Update {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Update", 2)?;
        state.serialize_field("update_id", &self.update_id)?;
        match &self.payload {
            Some(payload) => match payload {
                UpdatePayload::Message(m) => state.serialize_field("message", m)?,
                UpdatePayload::EditedMessage(m) => state.serialize_field("edited_message", m)?,
                UpdatePayload::ChannelPost(m) => state.serialize_field("channel_post", m)?,
                UpdatePayload::EditedChannelPost(m) => {
                    state.serialize_field("edited_channel_post", m)?;
                }
                UpdatePayload::InlineQuery(q) => state.serialize_field("inline_query", q)?,
                UpdatePayload::ChosenInlineResult(r) => {
                    state.serialize_field("chosen_inline_result", r)?;
                }
                UpdatePayload::CallbackQuery(q) => state.serialize_field("callback_query", q)?,
                UpdatePayload::ShippingQuery(q) => state.serialize_field("shipping_query", q)?,
                UpdatePayload::PreCheckoutQuery(q) => {
                    state.serialize_field("pre_checkout_query", q)?;
                }
                UpdatePayload::Poll(p) => state.serialize_field("poll", p)?,
                UpdatePayload::PollAnswer(a) => state.serialize_field("poll_answer", a)?,
            },
            None => {}
        }
        state.end()
    }
}
