//! HTTP transport for chat platform webhooks.
//!
//! Routes:
//! - `POST <webhook path>`: one platform update; answered `200 ok` at once,
//!   processed in its own task, reply delivered through the platform API
//! - `GET /health`: liveness and catalog size
//!
//! When a webhook secret is configured the webhook route requires it.

use crate::auth::{WebhookSecret, secret_token_middleware};
use crate::bot::Coordinator;
use crate::error::{BotError, BotResult};
use crate::transport::telegram::{MessageSender, Update, deliver};
use crate::transport::{Transport, wait_for_signal};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state of the webhook routes.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub sender: Arc<dyn MessageSender>,
}

pub struct HttpTransport {
    state: AppState,
    secret: Arc<WebhookSecret>,
    host: String,
    port: u16,
    webhook_path: String,
}

impl HttpTransport {
    pub fn new(
        state: AppState,
        secret: WebhookSecret,
        host: impl Into<String>,
        port: u16,
        webhook_path: impl Into<String>,
    ) -> Self {
        Self {
            state,
            secret: Arc::new(secret),
            host: host.into(),
            port,
            webhook_path: webhook_path.into(),
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn webhook_path(&self) -> &str {
        &self.webhook_path
    }

    pub fn router(&self) -> Router {
        router(self.state.clone(), &self.webhook_path, self.secret.clone())
    }
}

/// Build the webhook and health routes.
pub fn router(state: AppState, webhook_path: &str, secret: Arc<WebhookSecret>) -> Router {
    let webhook = Router::new()
        .route(webhook_path, post(webhook_handler))
        .route_layer(middleware::from_fn_with_state(secret, secret_token_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .merge(webhook)
        .with_state(state)
}

async fn webhook_handler(State(state): State<AppState>, Json(update): Json<Update>) -> &'static str {
    debug!(update_id = update.update_id, "Webhook update received");
    tokio::spawn(async move {
        handle_update(&state, &update).await;
    });
    "ok"
}

async fn health_handler(State(state): State<AppState>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "system": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "databases": state.coordinator.registry().len(),
    }))
}

/// Process one update and deliver the reply. Non-text updates are ignored.
///
/// Returns whether a reply was delivered.
pub async fn handle_update(state: &AppState, update: &Update) -> bool {
    let Some((chat_id, text)) = update.text_message() else {
        debug!(update_id = update.update_id, "Ignoring update without text");
        return false;
    };

    let conversation_id = chat_id.to_string();
    let response = state.coordinator.handle(&conversation_id, text).await;
    info!(chat_id, success = response.success, "Replying");
    deliver(state.sender.as_ref(), chat_id, &response.text).await
}

impl Transport for HttpTransport {
    async fn run(&self) -> BotResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting HTTP transport on {}", bind_addr);
        if !self.secret.is_enabled() {
            warn!("No webhook secret configured; webhook deliveries are not authenticated");
        }

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            BotError::transport(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;
        info!(path = %self.webhook_path, "Webhook endpoint ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, self.router()).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(BotError::transport(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for in-flight requests (send signal again to force exit)..."
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
