//! Greeting and help replies.

use crate::db::DatabaseRegistry;
use crate::handlers::text::{contains_any, has_word, normalize};
use chrono::{FixedOffset, Offset, Timelike, Utc};
use tracing::warn;

const GREETING_FRAGMENTS: &[&str] = &["hola", "buenos", "buenas", "buen dia", "good morning", "good afternoon"];
const GREETING_WORDS: &[&str] = &["hi", "hey", "hello"];
/// The platform's start command, after normalization strips the slash.
const START_COMMAND: &str = "start";
const HELP_FRAGMENTS: &[&str] = &["ayuda", "help", "como usar", "que puedo", "comandos"];

pub fn is_greeting(text: &str) -> bool {
    let normalized = normalize(text);
    normalized == START_COMMAND
        || contains_any(&normalized, GREETING_FRAGMENTS)
        || has_word(&normalized, GREETING_WORDS)
}

pub fn is_help_request(text: &str) -> bool {
    contains_any(&normalize(text), HELP_FRAGMENTS)
}

/// Salutation for a local hour of day.
pub fn salutation(hour: u32) -> &'static str {
    match hour {
        6..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

/// Builds greeting and help texts in a fixed local timezone.
#[derive(Debug, Clone)]
pub struct Greeter {
    offset: FixedOffset,
}

impl Greeter {
    /// Out-of-range offsets fall back to UTC.
    pub fn new(utc_offset_hours: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| {
            warn!(utc_offset_hours, "Invalid UTC offset, greeting in UTC");
            Utc.fix()
        });
        Self { offset }
    }

    pub fn local_hour(&self) -> u32 {
        Utc::now().with_timezone(&self.offset).hour()
    }

    pub fn greeting(&self, registry: &DatabaseRegistry) -> String {
        greeting_at(self.local_hour(), registry)
    }

    pub fn help(&self, registry: &DatabaseRegistry) -> String {
        help_text(registry)
    }
}

/// Greeting for a given local hour.
pub fn greeting_at(hour: u32, registry: &DatabaseRegistry) -> String {
    let databases = if registry.is_empty() {
        "No databases are configured yet.".to_string()
    } else {
        format!("🗄️ Databases I can query:\n{}", registry.short_listing())
    };
    format!(
        "{}! 👋 I'm your database monitoring assistant.\n\n\
         {databases}\n\n\
         ✍️ Write the database name followed by your question.\n\
         Example: BRM instance status\n\n\
         Send /help for more.",
        salutation(hour)
    )
}

/// Usage guide plus the live catalog listing.
pub fn help_text(registry: &DatabaseRegistry) -> String {
    format!(
        "📖 How to use this bot\n\n\
         1️⃣ Start with the database name or one of its aliases.\n\
         2️⃣ Then ask your question in plain language.\n\n\
         Examples:\n\
         • BRM estado de la base\n\
         • SAP uso de tablespaces\n\
         • consultas sesiones activas\n\
         • facturas bloqueos\n\n\
         ⚠️ Attempts:\n\
         • First message without a database: I will ask for it\n\
         • Second message without a database: the query is rejected\n\n\
         💡 If the second attempt fails, start over with: [DATABASE] [your query]\n\
         Only read-only queries are executed.\n\n\
         {}",
        registry.listing()
    )
}
