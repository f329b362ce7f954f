//! Bot assembly and lifecycle.
//!
//! A [`Bot`] is assembled in three phases:
//!
//! 1. configure: token, mode, concurrency;
//! 2. register: handlers for the update kinds the bot cares about;
//! 3. run: [`Bot::start`] freezes the registrations, picks a transport
//!    and returns a [`RunningBot`]; [`Bot::run`] additionally blocks until
//!    SIGINT/SIGTERM and shuts down cleanly.
//!
//! A webhook section in the configuration always selects webhook mode;
//! otherwise the bot long-polls. Startup is fail-fast: a missing token, a
//! rejected `setWebhook` or an unbindable listen address all surface as
//! [`StartError`] before any update is fetched.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ferrogram_core::{
    CallbackQuery, ChosenInlineResult, Dispatcher, InlineQuery, Message, Poll, PollAnswer,
    PreCheckoutQuery, RegistryBuilder, ShippingQuery,
};

use crate::config::{BotConfig, WebhookConfig};
use crate::error::{StartError, StartResult};
use crate::logging;

#[cfg(any(feature = "long-poll", feature = "webhook"))]
use ferrogram_transport::ApiClient;

/// A bot being assembled: configuration plus handler registrations.
pub struct Bot {
    config: BotConfig,
    registry: RegistryBuilder,
    #[cfg(any(feature = "long-poll", feature = "webhook"))]
    api_client: Option<ApiClient>,
}

macro_rules! delegate_slot {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name<H, Fut>(&mut self, handler: H)
        where
            H: Fn($ty) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = ()> + Send + 'static,
        {
            self.registry.$name(handler);
        }
    };
}

impl Bot {
    /// Creates a long-polling bot with the given token and default
    /// configuration. Does not touch the logging setup.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            config: BotConfig {
                token: token.into(),
                ..BotConfig::default()
            },
            registry: RegistryBuilder::new(),
            #[cfg(any(feature = "long-poll", feature = "webhook"))]
            api_client: None,
        }
    }

    /// Creates a bot from a full configuration and installs the logging
    /// subscriber at the configured level.
    pub fn from_config(config: BotConfig) -> Self {
        logging::init(&config.log_level);
        Self {
            config,
            registry: RegistryBuilder::new(),
            #[cfg(any(feature = "long-poll", feature = "webhook"))]
            api_client: None,
        }
    }

    /// Shorthand for [`BotConfig::from_env`] followed by
    /// [`Bot::from_config`].
    pub fn from_env() -> StartResult<Self> {
        Ok(Self::from_config(BotConfig::from_env()?))
    }

    /// Switches to webhook mode: register `url` with the service and listen
    /// on `listen_addr`.
    pub fn with_webhook(mut self, url: impl Into<String>, listen_addr: impl Into<String>) -> Self {
        self.config.webhook = Some(WebhookConfig {
            url: url.into(),
            listen_addr: listen_addr.into(),
        });
        self
    }

    /// Overrides the service base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Overrides the cap on concurrently running handlers.
    pub fn with_dispatch_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.dispatch_concurrency = max_concurrency;
        self
    }

    /// Replaces the default API client (custom TLS, proxy, timeouts). The
    /// configured base URL is ignored when this is set.
    #[cfg(any(feature = "long-poll", feature = "webhook"))]
    pub fn with_api_client(mut self, api_client: ApiClient) -> Self {
        self.api_client = Some(api_client);
        self
    }

    // ===== Handler registration =====

    /// Registers a handler for incoming messages whose text equals `text`.
    pub fn on_message<H, Fut>(&mut self, text: impl Into<String>, handler: H)
    where
        H: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.registry.on_message(text, handler);
    }

    delegate_slot!(
        /// Registers the fallback handler for messages without an exact-text match.
        on_message_default, Message
    );
    delegate_slot!(
        /// Registers the handler for messages announcing new chat members.
        /// Such messages skip text routing entirely.
        on_new_chat_members, Message
    );
    delegate_slot!(
        /// Registers the handler for edited messages.
        on_edited_message, Message
    );
    delegate_slot!(
        /// Registers the handler for channel posts.
        on_channel_post, Message
    );
    delegate_slot!(
        /// Registers the handler for edited channel posts.
        on_edited_channel_post, Message
    );
    delegate_slot!(
        /// Registers the handler for inline queries.
        on_inline_query, InlineQuery
    );
    delegate_slot!(
        /// Registers the handler for chosen inline results.
        on_inline_result, ChosenInlineResult
    );
    delegate_slot!(
        /// Registers the handler for callback queries (inline button presses).
        on_callback_query, CallbackQuery
    );
    delegate_slot!(
        /// Registers the handler for shipping queries.
        on_shipping_query, ShippingQuery
    );
    delegate_slot!(
        /// Registers the handler for pre-checkout queries.
        on_pre_checkout_query, PreCheckoutQuery
    );
    delegate_slot!(
        /// Registers the handler for anonymous poll updates.
        on_poll, Poll
    );
    delegate_slot!(
        /// Registers the handler for non-anonymous poll answers.
        on_poll_answer, PollAnswer
    );

    // ===== Lifecycle =====

    /// Freezes the handler registrations, starts the configured transport
    /// and returns a handle to the running bot.
    pub async fn start(mut self) -> StartResult<RunningBot> {
        if self.config.token.is_empty() {
            return Err(StartError::MissingToken);
        }

        let dispatcher =
            Dispatcher::with_concurrency(self.registry.build(), self.config.dispatch_concurrency);
        let cancel = CancellationToken::new();

        #[cfg(any(feature = "long-poll", feature = "webhook"))]
        let api = self.api_client.take().unwrap_or_else(|| {
            ApiClient::new(self.config.token.clone()).with_base_url(self.config.base_url.clone())
        });

        let task = if let Some(webhook) = self.config.webhook.take() {
            #[cfg(feature = "webhook")]
            {
                start_webhook(&api, webhook, dispatcher, cancel.clone()).await?
            }
            #[cfg(not(feature = "webhook"))]
            {
                let _ = (webhook, dispatcher);
                return Err(StartError::ModeUnavailable("webhook"));
            }
        } else {
            #[cfg(feature = "long-poll")]
            {
                start_long_poll(api, dispatcher, cancel.clone())
            }
            #[cfg(not(feature = "long-poll"))]
            {
                let _ = dispatcher;
                return Err(StartError::ModeUnavailable("long-poll"));
            }
        };

        Ok(RunningBot { cancel, task })
    }

    /// Starts the bot and blocks until SIGINT or SIGTERM, then shuts down.
    pub async fn run(self) -> StartResult<()> {
        let running = self.start().await?;
        wait_for_shutdown().await;
        running.stop();
        running.join().await;
        Ok(())
    }
}

#[cfg(feature = "webhook")]
async fn start_webhook(
    api: &ApiClient,
    webhook: WebhookConfig,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
) -> StartResult<JoinHandle<()>> {
    use std::sync::Arc;

    use ferrogram_transport::{UpdateSink, WebhookListener};

    api.set_webhook(&webhook.url)
        .await
        .map_err(StartError::WebhookRegistration)?;
    let listener = WebhookListener::bind(&webhook.listen_addr).await?;
    info!(addr = %listener.local_addr(), url = %webhook.url, "starting in webhook mode");

    let sink: UpdateSink = Arc::new(move |update| dispatcher.dispatch(update));
    Ok(tokio::spawn(listener.serve(sink, cancel)))
}

#[cfg(feature = "long-poll")]
fn start_long_poll(
    api: ApiClient,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    use std::sync::Arc;

    use ferrogram_transport::Poller;

    info!("starting in long-poll mode");
    let poller = Poller::new(Arc::new(api), cancel);
    tokio::spawn(poller.run(move |batch| dispatcher.dispatch_batch(batch)))
}

/// A started bot. Dropping it does not stop the transport; call
/// [`RunningBot::stop`].
pub struct RunningBot {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RunningBot {
    /// Signals the transport to shut down. Idempotent; in-flight handlers
    /// keep running to completion.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Waits for the transport task to finish. Call [`RunningBot::stop`]
    /// first, or this waits forever.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "transport task ended abnormally");
        }
    }
}

/// Resolves when the process receives SIGINT (ctrl-c) or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("ctrl-c received, shutting down"),
        () = terminate => info!("SIGTERM received, shutting down"),
    }
}
