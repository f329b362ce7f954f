//! Bot configuration.
//!
//! All knobs live in one [`BotConfig`] struct. [`BotConfig::from_env`] fills
//! it from `FERROGRAM_`-prefixed environment variables layered over the
//! defaults, with `__` separating nested fields:
//!
//! ```text
//! FERROGRAM_TOKEN=123:abc
//! FERROGRAM_WEBHOOK__URL=https://bot.example/hook
//! FERROGRAM_WEBHOOK__LISTEN_ADDR=0.0.0.0:8443
//! FERROGRAM_DISPATCH_CONCURRENCY=128
//! ```
//!
//! Presence of the `webhook` section selects webhook mode; without it the
//! bot long-polls.

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

use ferrogram_core::DEFAULT_CONCURRENCY;

use crate::error::{StartError, StartResult};

/// Environment variable prefix for [`BotConfig::from_env`].
pub const ENV_PREFIX: &str = "FERROGRAM_";

/// Webhook-mode settings. Present iff the bot should run in webhook mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Externally reachable URL to register with the service. Must route to
    /// `listen_addr` through whatever TLS termination sits in front.
    pub url: String,

    /// Local address the HTTP listener binds.
    pub listen_addr: String,
}

/// Everything a [`Bot`](crate::Bot) needs to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot API authentication token. Required, and secret: it is embedded
    /// in every request URL and must never be logged.
    pub token: String,

    /// Service base URL. Override for proxies or test servers.
    pub base_url: String,

    /// Webhook mode, if set. Takes precedence over long-polling.
    pub webhook: Option<WebhookConfig>,

    /// Cap on concurrently running handlers.
    pub dispatch_concurrency: usize,

    /// Default log filter, overridable via `RUST_LOG`.
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: "https://api.telegram.org".to_string(),
            webhook: None,
            dispatch_concurrency: DEFAULT_CONCURRENCY,
            log_level: "info".to_string(),
        }
    }
}

impl BotConfig {
    /// Loads configuration from the environment, layered over defaults.
    pub fn from_env() -> StartResult<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| StartError::Config(e.to_string()))
    }
}
