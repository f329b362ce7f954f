//! Minimal Bot API client for the operations the transports need.
//!
//! The core deliberately does not carry a full outbound client: the only two
//! operations it performs against the service are the raw update retrieval
//! (`getUpdates`, long-poll mode) and webhook registration (`setWebhook`,
//! webhook mode). Everything user-facing (sending messages, answering
//! callbacks, ...) lives outside this workspace.
//!
//! [`UpdateSource`] is the seam between the poll loop and the HTTP client,
//! so the loop can be driven by a scripted source in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use ferrogram_core::{ApiError, ApiResult, Update};

/// Default service base URL.
pub const API_BASE_URL: &str = "https://api.telegram.org";

/// Client-side ceiling on one `getUpdates` request. Larger than the 60 s
/// server-side wait so a healthy long poll is never cut short, but bounded
/// so a stalled connection cannot hang the loop.
const LONG_POLL_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The envelope every Bot API method answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwraps the envelope: `ok: false` becomes [`ApiError::Rejected`]
    /// carrying the service's description.
    pub fn into_result(self) -> ApiResult<T> {
        if !self.ok {
            let description = self
                .description
                .unwrap_or_else(|| "no description".to_string());
            return Err(ApiError::Rejected(description));
        }
        self.result
            .ok_or_else(|| ApiError::Decode("ok response without result".to_string()))
    }
}

/// Anything that can produce update batches for the poll loop.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Retrieves the next batch of updates at `offset`, holding the request
    /// open server-side for up to `timeout_secs`.
    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> ApiResult<Vec<Update>>;
}

/// HTTP client for the Bot API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Creates a client against [`API_BASE_URL`].
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: API_BASE_URL.to_string(),
            token: token.into(),
        }
    }

    /// Overrides the service base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Overrides the underlying HTTP client (custom TLS, proxy, timeouts).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Full URL for a Bot API method. Contains the token; never log it.
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Registers `url` as the externally reachable webhook endpoint.
    pub async fn set_webhook(&self, url: &str) -> ApiResult<()> {
        debug!(url = %url, "registering webhook");
        let response = self
            .http
            .post(self.method_url("setWebhook"))
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        let envelope: ApiResponse<bool> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        envelope.into_result().map(|_| ())
    }
}

#[async_trait]
impl UpdateSource for ApiClient {
    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> ApiResult<Vec<Update>> {
        let response = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset), ("timeout", timeout_secs as i64)])
            .timeout(LONG_POLL_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        let envelope: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        envelope.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_url_embeds_token() {
        let client = ApiClient::new("123:abc").with_base_url("https://proxy.example/");
        assert_eq!(
            client.method_url("getUpdates"),
            "https://proxy.example/bot123:abc/getUpdates"
        );
    }

    #[test]
    fn envelope_decodes_update_batch() {
        let json = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {
                    "message_id": 1, "date": 0,
                    "chat": {"id": 5, "type": "private"},
                    "text": "yo"
                }},
                {"update_id": 11, "poll": {"id": "p", "question": "?"}}
            ]
        }"#;

        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        let batch = envelope.into_result().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].update_id, 10);
        assert_eq!(batch[1].update_id, 11);
    }

    #[test]
    fn not_ok_envelope_becomes_rejected() {
        let json = r#"{"ok": false, "description": "Unauthorized"}"#;
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        match envelope.into_result() {
            Err(ApiError::Rejected(description)) => assert_eq!(description, "Unauthorized"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
