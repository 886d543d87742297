//! Text-generation service.
//!
//! The pipeline depends only on the [`TextGenerator`] trait; the production
//! implementation is [`OpenAiClient`], an OpenAI-compatible chat-completions
//! client. Tests substitute scripted generators.

pub mod client;
pub mod intent;

pub use client::OpenAiClient;
pub use intent::{IntentAnalysis, IntentAnalyzer, MonitoringCategory};

use crate::error::BotResult;
use async_trait::async_trait;

/// One completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// Produces free text from a system instruction and a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> BotResult<String>;
}

/// Remove markdown code fences (with or without a language tag).
pub fn strip_code_fences(text: &str) -> String {
    let mut out = Vec::new();
    for line in text.trim().lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("```") {
            // A fence line may carry a language tag and nothing else
            if rest.chars().all(|c| c.is_alphanumeric()) {
                continue;
            }
        }
        out.push(line);
    }
    out.join("\n").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("SELECT 1"), "SELECT 1");
    }
}
