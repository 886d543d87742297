//! Configuration handling for the chat router.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::bot::conversation::DEFAULT_CONVERSATION_TTL_SECS;
use crate::db::executor::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_QUERY_TIMEOUT_SECS};
use crate::llm::client::{DEFAULT_API_BASE, DEFAULT_MODEL};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CATALOG_PATH: &str = "config/catalog.json";
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -6;
pub const DEFAULT_STDIO_CONVERSATION_ID: &str = "stdio";

/// Transport used for inbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// One message per stdin line, replies on stdout
    #[default]
    Stdio,
    /// Chat platform webhook over HTTP
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// One-shot maintenance commands. Without one, the bot runs its transport.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Manage the chat platform webhook
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum WebhookAction {
    /// Show the current webhook registration
    Info,
    /// Register the webhook URL
    Set {
        /// Public HTTPS URL of the webhook endpoint
        url: String,
    },
    /// Remove the webhook registration
    Delete,
    /// Check the bot token by fetching the bot's identity
    Test,
}

/// Configuration for the chat router.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-chat-router",
    about = "Chat bot that answers database monitoring questions with read-only SQL",
    version,
    author
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path of the JSON database catalog
    #[arg(long, default_value = DEFAULT_CATALOG_PATH, env = "DBCHAT_CATALOG")]
    pub catalog: PathBuf,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "DBCHAT_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "DBCHAT_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "DBCHAT_HTTP_PORT")]
    pub http_port: u16,

    /// Path receiving webhook deliveries
    #[arg(long, default_value = DEFAULT_WEBHOOK_PATH, env = "DBCHAT_WEBHOOK_PATH")]
    pub webhook_path: String,

    /// Shared secret expected in the webhook secret header
    #[arg(long, env = "DBCHAT_WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    /// Chat platform bot token
    #[arg(long, env = "DBCHAT_TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Chat platform API base URL
    #[arg(long, default_value = DEFAULT_TELEGRAM_API_BASE, env = "DBCHAT_TELEGRAM_API_BASE")]
    pub telegram_api_base: String,

    /// Text-generation service base URL (OpenAI-compatible)
    #[arg(long, default_value = DEFAULT_API_BASE, env = "DBCHAT_LLM_API_BASE")]
    pub llm_api_base: String,

    /// Text-generation service API key
    #[arg(long, env = "DBCHAT_LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Text-generation model name
    #[arg(long, default_value = DEFAULT_MODEL, env = "DBCHAT_LLM_MODEL")]
    pub llm_model: String,

    /// Text-generation request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_LLM_TIMEOUT_SECS, env = "DBCHAT_LLM_TIMEOUT")]
    pub llm_timeout: u64,

    /// Add intent-analysis hints to query generation prompts
    #[arg(long, env = "DBCHAT_INTENT_ANALYSIS")]
    pub intent_analysis: bool,

    /// Query timeout in seconds
    #[arg(long, default_value_t = DEFAULT_QUERY_TIMEOUT_SECS, env = "DBCHAT_QUERY_TIMEOUT")]
    pub query_timeout: u64,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, env = "DBCHAT_CONNECT_TIMEOUT")]
    pub connect_timeout: u64,

    /// Lifetime of a pending conversation in seconds
    #[arg(long, default_value_t = DEFAULT_CONVERSATION_TTL_SECS, env = "DBCHAT_CONVERSATION_TTL")]
    pub conversation_ttl: u64,

    /// UTC offset in hours used for the time-of-day greeting
    #[arg(
        long,
        default_value_t = DEFAULT_UTC_OFFSET_HOURS,
        env = "DBCHAT_UTC_OFFSET",
        allow_hyphen_values = true
    )]
    pub utc_offset: i32,

    /// Conversation id used by the stdio transport
    #[arg(long, default_value = DEFAULT_STDIO_CONVERSATION_ID, env = "DBCHAT_CONVERSATION_ID")]
    pub conversation_id: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "DBCHAT_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DBCHAT_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            command: None,
            catalog: PathBuf::from(DEFAULT_CATALOG_PATH),
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            webhook_path: DEFAULT_WEBHOOK_PATH.to_string(),
            webhook_secret: None,
            telegram_token: None,
            telegram_api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            llm_api_base: DEFAULT_API_BASE.to_string(),
            llm_api_key: None,
            llm_model: DEFAULT_MODEL.to_string(),
            llm_timeout: DEFAULT_LLM_TIMEOUT_SECS,
            intent_analysis: false,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            conversation_ttl: DEFAULT_CONVERSATION_TTL_SECS,
            utc_offset: DEFAULT_UTC_OFFSET_HOURS,
            conversation_id: DEFAULT_STDIO_CONVERSATION_ID.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Validate values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        if !self.webhook_path.starts_with('/') {
            return Err(format!(
                "Webhook path must start with '/': {}",
                self.webhook_path
            ));
        }
        if !(-12..=14).contains(&self.utc_offset) {
            return Err(format!(
                "UTC offset must be between -12 and 14 hours: {}",
                self.utc_offset
            ));
        }
        if self.query_timeout == 0 || self.connect_timeout == 0 {
            return Err("Timeouts must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Bot token with surrounding whitespace removed; `None` when blank.
    pub fn telegram_token(&self) -> Option<&str> {
        self.telegram_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn llm_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.llm_timeout)
    }

    pub fn conversation_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.conversation_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.webhook_path, "/webhook");
        assert_eq!(config.conversation_ttl, 600);
        assert_eq!(config.utc_offset, -6);
        assert!(!config.intent_analysis);
        assert!(config.command.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_durations() {
        let config = Config {
            query_timeout: 60,
            connect_timeout: 15,
            llm_timeout: 5,
            conversation_ttl: 120,
            ..Config::default()
        };
        assert_eq!(config.query_timeout_duration(), Duration::from_secs(60));
        assert_eq!(config.connect_timeout_duration(), Duration::from_secs(15));
        assert_eq!(config.llm_timeout_duration(), Duration::from_secs(5));
        assert_eq!(config.conversation_ttl_duration(), Duration::from_secs(120));
    }

    #[test]
    fn test_transport_mode_display() {
        assert_eq!(TransportMode::Stdio.to_string(), "stdio");
        assert_eq!(TransportMode::Http.to_string(), "http");
    }

    #[test]
    fn test_parse_cli_arguments() {
        let config = Config::try_parse_from([
            "db-chat-router",
            "--transport",
            "http",
            "--http-port",
            "9000",
            "--utc-offset",
            "-5",
            "--catalog",
            "/etc/bot/catalog.json",
        ])
        .unwrap();
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.utc_offset, -5);
        assert_eq!(config.catalog, PathBuf::from("/etc/bot/catalog.json"));
    }

    #[test]
    fn test_parse_webhook_subcommand() {
        let config =
            Config::try_parse_from(["db-chat-router", "webhook", "set", "https://bot.example.com/webhook"])
                .unwrap();
        assert_eq!(
            config.command,
            Some(Command::Webhook {
                action: WebhookAction::Set {
                    url: "https://bot.example.com/webhook".to_string()
                }
            })
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            webhook_path: "webhook".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            utc_offset: 20,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            query_timeout: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_token_reads_as_missing() {
        let config = Config {
            telegram_token: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.telegram_token(), None);
    }
}
