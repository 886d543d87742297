//! db-chat-router - Main entry point.
//!
//! Answers database monitoring questions from chat, either over stdio or as a
//! chat platform webhook.

use clap::Parser;
use db_chat_router::auth::WebhookSecret;
use db_chat_router::bot::{ConversationStore, Coordinator};
use db_chat_router::config::{Command, Config, TransportMode};
use db_chat_router::db::{Backend, DatabaseRegistry, QueryExecutor, SqlxBackend};
use db_chat_router::handlers::Greeter;
use db_chat_router::llm::{OpenAiClient, TextGenerator};
use db_chat_router::transport::http::AppState;
use db_chat_router::transport::telegram::run_webhook_command;
use db_chat_router::transport::{HttpTransport, StdioTransport, TelegramClient, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so stdout stays reserved for stdio replies.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn telegram_client(config: &Config) -> Result<TelegramClient, Box<dyn std::error::Error>> {
    let token = config
        .telegram_token()
        .ok_or("A bot token is required (--telegram-token or DBCHAT_TELEGRAM_TOKEN)")?;
    Ok(TelegramClient::new(
        &config.telegram_api_base,
        token,
        config.llm_timeout_duration(),
    )?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }

    if let Some(Command::Webhook { action }) = &config.command {
        let client = telegram_client(&config)?;
        let secret = config.webhook_secret.as_deref().map(str::trim).filter(|s| !s.is_empty());
        match run_webhook_command(&client, action, secret).await {
            Ok(text) => {
                println!("{text}");
                return Ok(());
            }
            Err(e) => {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
        }
    }

    info!(
        transport = %config.transport,
        "Starting db-chat-router v{}",
        env!("CARGO_PKG_VERSION")
    );

    let registry = Arc::new(DatabaseRegistry::load(&config.catalog));
    if registry.is_empty() {
        warn!(path = %config.catalog.display(), "No databases available; only greetings and help will work");
    }
    for entry in registry.entries() {
        info!(
            id = %entry.id,
            kind = %entry.connection.kind,
            aliases = ?entry.aliases,
            "Database available"
        );
    }

    let api_key = config.llm_api_key.clone().unwrap_or_default();
    if api_key.trim().is_empty() {
        warn!("No text-generation API key; generated queries and analyses will use fallbacks");
    }
    let generator: Arc<dyn TextGenerator> = Arc::new(OpenAiClient::new(
        &config.llm_api_base,
        api_key,
        &config.llm_model,
        config.llm_timeout_duration(),
    )?);

    let conversations = Arc::new(ConversationStore::new(config.conversation_ttl_duration()));
    ConversationStore::start_cleanup_task(conversations.clone());

    let backend: Arc<dyn Backend> = Arc::new(SqlxBackend::new());
    let executor = QueryExecutor::with_timeouts(
        backend.clone(),
        config.connect_timeout_duration(),
        config.query_timeout_duration(),
    );

    let mut coordinator = Coordinator::new(registry, generator.clone(), backend)
        .with_executor(executor)
        .with_greeter(Greeter::new(config.utc_offset))
        .with_conversation_store(conversations);
    if config.intent_analysis {
        info!("Intent analysis enabled");
        coordinator = coordinator.with_intent_analysis(generator);
    }
    let coordinator = Arc::new(coordinator);

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(coordinator, &config.conversation_id);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                path = %config.webhook_path,
                "Using HTTP transport"
            );
            let state = AppState {
                coordinator,
                sender: Arc::new(telegram_client(&config)?),
            };
            let transport = HttpTransport::new(
                state,
                WebhookSecret::new(config.webhook_secret.clone()),
                &config.http_host,
                config.http_port,
                &config.webhook_path,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    Ok(())
}
