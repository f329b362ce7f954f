//! # Ferrogram
//!
//! An async update-dispatch framework for Telegram-style bots: register
//! handlers per update kind, pick long-polling or webhook delivery, run.
//!
//! ```no_run
//! use ferrogram::Bot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ferrogram::StartError> {
//!     let mut bot = Bot::new("123:abc");
//!     bot.on_message("/start", |message| async move {
//!         println!("hello, chat {}", message.chat.id);
//!     });
//!     bot.run().await
//! }
//! ```
//!
//! Configuration can also come from `FERROGRAM_`-prefixed environment
//! variables via [`Bot::from_env`]; a `FERROGRAM_WEBHOOK__URL` /
//! `FERROGRAM_WEBHOOK__LISTEN_ADDR` pair switches the bot to webhook mode.
//!
//! This crate is the facade over the workspace:
//!
//! - `ferrogram-core` — update model, handler registry, concurrent
//!   dispatcher;
//! - `ferrogram-transport` — long-poll loop and webhook listener, behind
//!   the `long-poll` and `webhook` features (both on by default).

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;

pub use bot::{Bot, RunningBot};
pub use config::{BotConfig, ENV_PREFIX, WebhookConfig};
pub use error::{StartError, StartResult};

pub use ferrogram_core::{
    CallbackQuery, Chat, ChosenInlineResult, InlineQuery, Message, Poll, PollAnswer, PollOption,
    PreCheckoutQuery, ShippingAddress, ShippingQuery, Update, UpdateKind, UpdatePayload, User,
};
