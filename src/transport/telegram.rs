//! Telegram Bot API client.
//!
//! Covers what the bot needs: delivering replies and managing the webhook
//! registration. Replies are plain text (no parse mode), cut to the platform
//! limit, and delivered with two fallbacks: the same text with markup
//! characters removed, then a fixed error line.
//!
//! The bot token is part of every method URL, so URLs are never logged.

use crate::config::WebhookAction;
use crate::error::{BotError, BotResult};
use crate::handlers::format::truncate_chars;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Longest message the platform accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Sent when neither the reply nor its plain variant could be delivered.
pub const DELIVERY_FALLBACK_TEXT: &str = "❌ Error processing the response. Please try again.";

const MARKUP_CHARS: &[char] = &['*', '_', '`'];

/// Inbound update, reduced to the fields the bot reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// `(chat id, text)` for text messages; `None` for anything else.
    pub fn text_message(&self) -> Option<(i64, &str)> {
        let message = self.message.as_ref()?;
        let text = message.text.as_deref()?;
        Some((message.chat.id, text))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub has_custom_certificate: bool,
    #[serde(default)]
    pub pending_update_count: u64,
    #[serde(default)]
    pub last_error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Something that can deliver a text message to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> BotResult<()>;
}

/// Client for `{api_base}/bot{token}/{method}`.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("token", &"***")
            .finish()
    }
}

impl TelegramClient {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> BotResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(BotError::transport("Bot token is not configured"));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> BotResult<T> {
        debug!(method, "Calling chat platform API");
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| BotError::transport(format!("{method} request failed: {}", e.without_url())))?;

        let status = response.status();
        let payload: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| BotError::transport(format!("{method} returned {status}: {}", e.without_url())))?;

        if !payload.ok {
            let description = payload.description.unwrap_or_else(|| status.to_string());
            return Err(BotError::transport(format!("{method} failed: {description}")));
        }
        payload
            .result
            .ok_or_else(|| BotError::transport(format!("{method} returned no result")))
    }

    pub async fn get_webhook_info(&self) -> BotResult<WebhookInfo> {
        self.call("getWebhookInfo", &json!({})).await
    }

    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> BotResult<()> {
        let mut body = json!({ "url": url });
        if let Some(secret) = secret {
            body["secret_token"] = json!(secret);
        }
        self.call::<bool>("setWebhook", &body).await.map(|_| ())
    }

    pub async fn delete_webhook(&self) -> BotResult<()> {
        self.call::<bool>("deleteWebhook", &json!({})).await.map(|_| ())
    }

    pub async fn get_me(&self) -> BotResult<BotIdentity> {
        self.call("getMe", &json!({})).await
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> BotResult<()> {
        let body = serde_json::to_value(SendMessage { chat_id, text })
            .map_err(|e| BotError::internal(format!("Failed to encode message: {e}")))?;
        self.call::<serde_json::Value>("sendMessage", &body)
            .await
            .map(|_| ())
    }
}

/// Cut a reply to the platform limit.
pub fn limit_message(text: &str) -> &str {
    truncate_chars(text, MAX_MESSAGE_CHARS)
}

/// Remove the characters chat markup parsers choke on.
pub fn strip_markup(text: &str) -> String {
    text.chars().filter(|c| !MARKUP_CHARS.contains(c)).collect()
}

/// Deliver a reply, falling back to plain text and then to a fixed line.
///
/// Returns whether any variant was delivered.
pub async fn deliver(sender: &dyn MessageSender, chat_id: i64, text: &str) -> bool {
    let text = limit_message(text);

    let first = match sender.send_message(chat_id, text).await {
        Ok(()) => return true,
        Err(e) => e,
    };
    warn!(chat_id, error = %first, "Reply not delivered; retrying without markup");

    let second = match sender.send_message(chat_id, &strip_markup(text)).await {
        Ok(()) => return true,
        Err(e) => e,
    };
    warn!(chat_id, error = %second, "Plain reply not delivered; sending fallback text");

    match sender.send_message(chat_id, DELIVERY_FALLBACK_TEXT).await {
        Ok(()) => true,
        Err(e) => {
            error!(chat_id, error = %e, "Fallback reply not delivered");
            false
        }
    }
}

/// Run a webhook maintenance command and describe the outcome.
pub async fn run_webhook_command(
    client: &TelegramClient,
    action: &WebhookAction,
    secret: Option<&str>,
) -> BotResult<String> {
    match action {
        WebhookAction::Info => {
            let info = client.get_webhook_info().await?;
            Ok(describe_webhook(&info))
        }
        WebhookAction::Set { url } => {
            client.set_webhook(url, secret).await?;
            let info = client.get_webhook_info().await?;
            Ok(format!("✅ Webhook set: {url}\n\n{}", describe_webhook(&info)))
        }
        WebhookAction::Delete => {
            client.delete_webhook().await?;
            let info = client.get_webhook_info().await?;
            Ok(format!("✅ Webhook deleted\n\n{}", describe_webhook(&info)))
        }
        WebhookAction::Test => {
            let me = client.get_me().await?;
            let username = me.username.as_deref().unwrap_or("unknown");
            Ok(format!("✅ Bot connected: @{username} ({})", me.first_name))
        }
    }
}

fn describe_webhook(info: &WebhookInfo) -> String {
    let url = if info.url.is_empty() {
        "not set"
    } else {
        info.url.as_str()
    };
    format!(
        "Webhook info:\n   URL: {url}\n   Custom certificate: {}\n   Pending updates: {}\n   Last error: {}",
        info.has_custom_certificate,
        info.pending_update_count,
        info.last_error_message.as_deref().unwrap_or("none")
    )
}
