//! Webhook receive transport.
//!
//! In webhook mode the service pushes each update as an HTTP POST to a URL
//! the bot registered via `setWebhook`. This module owns the receiving end:
//! a small axum server that decodes each request body into an [`Update`] and
//! forwards it to the dispatch sink. Registration itself is the facade's
//! job, so a listener can be bound (and its ephemeral port inspected) before
//! any external registration happens.
//!
//! The path is not checked: operators commonly put a secret segment in the
//! registered URL, and rejecting unknown paths would break that without
//! adding anything. Every request answers 200 immediately, before any
//! handler runs. That includes bodies that fail to decode: those are logged
//! and dropped, and the 200 still acknowledges the delivery, since a non-2xx
//! would make the service redeliver the same broken update forever.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use ferrogram_core::{TransportError, TransportResult, Update};

/// Where decoded updates go. Must not block; the dispatcher's
/// spawn-per-update entry point qualifies.
pub type UpdateSink = Arc<dyn Fn(Update) + Send + Sync>;

/// The webhook HTTP listener.
///
/// Binding and serving are split so startup can fail fast on a bad listen
/// address and so tests can bind port 0 and read back the assigned port.
pub struct WebhookListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl WebhookListener {
    /// Binds the listening socket.
    pub async fn bind(addr: &str) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Bind {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The actually bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until cancellation, pushing every decoded update into `sink`.
    pub async fn serve(self, sink: UpdateSink, cancel: CancellationToken) {
        let local_addr = self.local_addr;
        let router = Router::new()
            .route("/", post(receive_update))
            .route("/{*path}", post(receive_update))
            .with_state(sink);

        info!(addr = %local_addr, "webhook listener serving");
        tokio::select! {
            result = axum::serve(self.listener, router) => {
                if let Err(e) = result {
                    error!(error = %e, "webhook listener failed");
                }
            }
            () = cancel.cancelled() => {
                info!(addr = %local_addr, "webhook listener stopped");
            }
        }
    }
}

/// One pushed update. Decode, acknowledge, hand off. An undecodable body
/// is logged and dropped but still acknowledged, so the service never
/// redelivers it.
async fn receive_update(State(sink): State<UpdateSink>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            debug!(update_id = update.update_id, "webhook update received");
            sink(update);
        }
        Err(e) => error!(error = %e, "undecodable webhook body, dropping"),
    }
    StatusCode::OK
}
