//! Transport layer for the chat router.
//!
//! This module provides the ways messages reach the coordinator:
//! - Stdio: one message per line, for local use and scripting
//! - HTTP: chat platform webhook, replies sent through the platform API

pub mod http;
pub mod stdio;
pub mod telegram;

pub use http::HttpTransport;
pub use stdio::StdioTransport;
pub use telegram::{MessageSender, TelegramClient};

use crate::error::BotResult;
use std::future::Future;
use tokio::signal;
use tracing::{info, warn};

/// Trait for inbound transports.
pub trait Transport: Send + Sync {
    /// Start the transport and begin handling messages.
    ///
    /// This method should block until the transport is shut down.
    fn run(&self) -> impl Future<Output = BotResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub(crate) async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
