//! Target resolution.
//!
//! Works out which catalog database a message is about. The resolver itself
//! is stateless: the attempt number comes from the caller, which owns the
//! pending conversation state and acts on the returned [`Resolution`].

use crate::db::DatabaseRegistry;
use crate::handlers::text::{collapse_whitespace, is_connector, normalize, strip_non_alphanumeric};
use crate::models::DatabaseEntry;
use std::sync::Arc;
use tracing::{debug, info};

/// Attempts allowed before the dialog gives up.
pub const MAX_ATTEMPTS: u8 = 2;

/// Cleaned text shorter than this falls back to removing only the target token.
const MIN_REMAINING_CHARS: usize = 3;

/// Candidate tokens shorter than this are ignored.
const MIN_CANDIDATE_CHARS: usize = 2;

/// Outcome of one resolution attempt.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A catalog entry was named.
    Resolved {
        entry: DatabaseEntry,
        /// The token that matched, as written by the user.
        matched: String,
        /// The message with the target and connector words removed.
        remaining_text: String,
    },
    /// First attempt without a target: ask for it.
    NeedsMoreInput { next_attempt: u8, prompt: String },
    /// Final attempt without a target.
    Failed {
        candidates: Vec<String>,
        message: String,
    },
}

/// Resolves free text to a catalog entry.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    registry: Arc<DatabaseRegistry>,
}

impl TargetResolver {
    pub fn new(registry: Arc<DatabaseRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &DatabaseRegistry {
        &self.registry
    }

    /// Resolve the target of `text` for one conversation's attempt.
    pub fn resolve(&self, text: &str, conversation_id: &str, attempt: u8) -> Resolution {
        let candidates = extract_candidates(text);
        debug!(conversation_id, attempt, candidates = ?candidates, "Resolving target database");

        for candidate in &candidates {
            if let Some(entry) = self.registry.find(candidate) {
                info!(
                    conversation_id,
                    id = %entry.id,
                    token = %candidate,
                    attempt,
                    "Target database resolved"
                );
                return Resolution::Resolved {
                    entry: entry.clone(),
                    matched: candidate.clone(),
                    remaining_text: remove_target(text, candidate),
                };
            }
        }

        if attempt >= MAX_ATTEMPTS {
            info!(conversation_id, attempt, "Target database not found, giving up");
            return Resolution::Failed {
                message: self.not_found_message(&candidates),
                candidates,
            };
        }

        Resolution::NeedsMoreInput {
            next_attempt: attempt + 1,
            prompt: clarification_prompt(),
        }
    }

    fn not_found_message(&self, candidates: &[String]) -> String {
        let detected = if candidates.is_empty() {
            "none".to_string()
        } else {
            candidates.join(", ")
        };
        format!(
            "❌ Database not found after {MAX_ATTEMPTS} attempts.\n\n\
             🔍 Names detected in your reply: {detected}\n\n\
             ❗ Possible causes:\n\
             • The name is not in the catalog\n\
             • There is a typo\n\
             • The name was not stated clearly\n\n\
             💡 Start a new query with the format:\n\
             [DATABASE] [your query]\n\n\
             {}",
            self.registry.listing()
        )
    }
}

fn clarification_prompt() -> String {
    "❗ I need the database name to continue.\n\n\
     👉 Reply with the database name followed by your query.\n\
     Example: BRM, the database is SAP"
        .to_string()
}

/// Whitespace tokens with punctuation stripped, at least two characters long.
pub fn extract_candidates(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(strip_non_alphanumeric)
        .filter(|token| token.chars().count() >= MIN_CANDIDATE_CHARS)
        .collect()
}

/// Remove the matched token and connector words, keeping the rest in order.
///
/// When that leaves fewer than three characters only the token itself is
/// removed, so short queries keep their meaning.
pub fn remove_target(text: &str, token: &str) -> String {
    let target = normalize(token);
    let is_target = |word: &str| normalize(word) == target;

    let cleaned = collapse_whitespace(
        &text
            .split_whitespace()
            .filter(|word| !is_target(word) && !is_connector(&normalize(word)))
            .collect::<Vec<_>>()
            .join(" "),
    );

    if cleaned.chars().count() >= MIN_REMAINING_CHARS {
        return cleaned;
    }

    text.split_whitespace()
        .filter(|word| !is_target(word))
        .collect::<Vec<_>>()
        .join(" ")
}
