//! Result summarization.
//!
//! Only the formatted rows reach the text-generation service. The query text
//! and the user's question are accepted for logging but never sent, so the
//! narrative stays about the data.

use crate::handlers::format::NULL_TEXT;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::models::ResultSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rows included in the block sent for analysis.
pub const SUMMARY_ROWS: usize = 5;

/// Returned when the service cannot produce a narrative.
pub const ANALYSIS_UNAVAILABLE: &str = "automatic analysis unavailable";

const NO_ROWS: &str = "query returned no rows";
const SUMMARY_MAX_TOKENS: u32 = 300;

const ANALYST_SYSTEM: &str = "You are an expert database administrator. Your analyses are \
technical, concise and about the result rows only. At most 3-4 lines.";

/// Writes a short narrative about a result set.
#[derive(Clone)]
pub struct ResultSummarizer {
    generator: Arc<dyn TextGenerator>,
}

impl ResultSummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Never fails: service errors yield [`ANALYSIS_UNAVAILABLE`].
    pub async fn summarize(&self, result: &ResultSet, query: &str, original_text: &str) -> String {
        debug!(rows = result.len(), query_len = query.len(), question = %original_text, "Summarizing results");

        let prompt = format!(
            "Analyze ONLY the following RESULTS. Do not comment on the SQL query or the \
             user's question.\n\nRESULTS:\n{}\n\
             Give a brief, technical and clear analysis (3-4 lines at most). State whether \
             the data shows a problem or everything is within expected values.",
            format_rows(result, SUMMARY_ROWS)
        );

        match self
            .generator
            .generate(GenerationRequest::new(ANALYST_SYSTEM, prompt, SUMMARY_MAX_TOKENS))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Empty analysis from text generation service");
                ANALYSIS_UNAVAILABLE.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Result analysis failed");
                ANALYSIS_UNAVAILABLE.to_string()
            }
        }
    }
}

/// At most `max_rows` rows as `key=value, ...` lines.
pub fn format_rows(result: &ResultSet, max_rows: usize) -> String {
    if result.is_empty() {
        return format!("{NO_ROWS}\n");
    }

    let mut out = String::new();
    for row in result.rows.iter().take(max_rows) {
        let line = row
            .iter()
            .map(|(name, value)| format!("{}={}", name, value.unwrap_or(NULL_TEXT)))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&line);
        out.push('\n');
    }

    if result.len() > max_rows {
        out.push_str(&format!("(showing {} of {} rows)\n", max_rows, result.len()));
    }
    out
}
