//! Webhook secret check for the HTTP transport.
//!
//! The chat platform echoes a shared secret in
//! `X-Telegram-Bot-Api-Secret-Token` on every webhook delivery. When a secret
//! is configured, deliveries without the matching header are rejected.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Header carrying the webhook secret.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Expected webhook secret, if any.
#[derive(Clone, Default)]
pub struct WebhookSecret {
    expected: Option<String>,
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSecret")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl WebhookSecret {
    /// Blank secrets disable the check.
    pub fn new(secret: Option<String>) -> Self {
        let expected = secret
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self { expected }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    pub fn expected(&self) -> Option<&str> {
        self.expected.as_deref()
    }

    /// True when the check is disabled or `provided` matches.
    pub fn verify(&self, provided: Option<&str>) -> bool {
        match (&self.expected, provided) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(expected), Some(provided)) => {
                constant_time_eq(provided.as_bytes(), expected.as_bytes())
            }
        }
    }
}

/// Rejects webhook deliveries whose secret header does not match.
pub async fn secret_token_middleware(
    State(secret): State<Arc<WebhookSecret>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = match request.headers().get(SECRET_HEADER) {
        Some(value) => match value.to_str() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Webhook rejected: secret header contains invalid characters");
                return unauthorized_response("Secret token header contains invalid characters");
            }
        },
        None => None,
    };

    if secret.verify(provided) {
        next.run(request).await
    } else {
        warn!(
            header_present = provided.is_some(),
            "Webhook rejected: secret token mismatch"
        );
        unauthorized_response("Invalid or missing secret token")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn unauthorized_response(message: impl Into<String>) -> Response {
    #[derive(Serialize)]
    struct ErrorResponse { error: ErrorDetail }
    #[derive(Serialize)]
    struct ErrorDetail { code: &'static str, message: String }

    let body = ErrorResponse {
        error: ErrorDetail {
            code: "unauthorized",
            message: message.into(),
        },
    };
    let json = serde_json::to_string(&body).unwrap_or_else(|_| {
        r#"{"error":{"code":"unauthorized","message":"Authentication failed"}}"#.to_string()
    });

    (StatusCode::UNAUTHORIZED, [(header::CONTENT_TYPE, "application/json")], json).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_secret_disables_check() {
        assert!(!WebhookSecret::new(None).is_enabled());
        assert!(!WebhookSecret::new(Some("  ".to_string())).is_enabled());
        assert!(WebhookSecret::disabled().verify(None));
        assert!(WebhookSecret::disabled().verify(Some("anything")));
    }

    #[test]
    fn test_verify() {
        let secret = WebhookSecret::new(Some(" s3cret ".to_string()));
        assert!(secret.is_enabled());
        assert!(secret.verify(Some("s3cret")));
        assert!(!secret.verify(Some("s3cre")));
        assert!(!secret.verify(Some("s3cret!")));
        assert!(!secret.verify(None));
    }

    #[test]
    fn test_debug_hides_secret() {
        let secret = WebhookSecret::new(Some("s3cret".to_string()));
        assert!(!format!("{secret:?}").contains("s3cret"));
    }
}
