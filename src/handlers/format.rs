//! Chat response formatting.
//!
//! Renders the final reply for a successful query: target header, how the
//! query was obtained, up to five records with per-column decoration, the
//! narrative and, for weak plans, a hint to rephrase. Output is plain text;
//! the chat transport sends it without a parse mode.

use crate::models::{ConfidenceLabel, DatabaseEntry, QueryOrigin, QueryPlan, ResultRow, ResultSet};
use humansize::{BINARY, format_size};
use unicode_width::UnicodeWidthChar;

/// Rendering of SQL NULL.
pub const NULL_TEXT: &str = "NULL";

/// Records shown in a reply.
pub const MAX_RECORDS: usize = 5;

/// Cell values wider than this are cut.
pub const MAX_VALUE_WIDTH: usize = 100;

/// Replies longer than this are cut.
pub const MAX_RESPONSE_CHARS: usize = 3500;

const TRUNCATED_NOTE: &str = "\n\n⚠️ Result truncated for length.";
const LOW_CONFIDENCE_HINT: &str =
    "\n💡 Tip: if the results are not what you expected, try being more specific in your query.";

/// Cut `value` to `max_width` display columns, appending `...` when cut.
pub fn format_value(value: Option<&str>, max_width: usize) -> String {
    let Some(value) = value else {
        return NULL_TEXT.to_string();
    };

    let mut width = 0;
    let mut out = String::new();
    for c in value.chars() {
        width += c.width().unwrap_or(0);
        if width > max_width {
            out.push_str("...");
            return out;
        }
        out.push(c);
    }
    out
}

/// Keep at most `max_chars` characters, on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn format_cell(column: &str, value: Option<&str>) -> String {
    let upper = column.to_uppercase();
    let shown = format_value(value, MAX_VALUE_WIDTH);

    if upper.contains("PCT") || upper.contains("PERCENT") {
        format!("📈 {column}: {shown}%")
    } else if upper.contains("BYTES") {
        match value.and_then(|v| v.trim().parse::<u64>().ok()) {
            Some(bytes) => format!("💾 {column}: {shown} ({})", format_size(bytes, BINARY)),
            None => format!("💾 {column}: {shown}"),
        }
    } else if upper.contains("SIZE") {
        format!("💾 {column}: {shown}")
    } else if upper.contains("STATUS") {
        let healthy = value
            .map(|v| {
                let v = v.to_uppercase();
                v.contains("ACTIVE") || v.contains("ONLINE") || v.contains("OPEN")
            })
            .unwrap_or(false);
        let mark = if healthy { "✅" } else { "⚠️" };
        format!("{mark} {column}: {shown}")
    } else {
        format!("🔸 {column}: {shown}")
    }
}

fn format_record(index: usize, row: &ResultRow) -> String {
    let mut out = format!("--- Record {index} ---\n");
    for (column, value) in row.iter() {
        out.push_str(&format_cell(column, value));
        out.push('\n');
    }
    out.push('\n');
    out
}

fn origin_line(plan: &QueryPlan) -> String {
    let name = plan.name.as_deref().unwrap_or("N/A");
    if plan.origin == QueryOrigin::Predefined {
        return format!("🔧 Type: Predefined query ({name})\n");
    }

    let label = plan.confidence_label();
    let light = match label {
        ConfidenceLabel::High => "🟢",
        ConfidenceLabel::Medium => "🟡",
        ConfidenceLabel::Low => "🔴",
    };
    let kind = match plan.origin {
        QueryOrigin::TemplateMatched => format!("Template query ({name})"),
        QueryOrigin::FallbackGenerated => format!("Fallback query ({name})"),
        _ => "AI-generated SQL".to_string(),
    };
    format!(
        "🤖 Type: {kind} {light} (Confidence: {:.0}%, {})\n",
        plan.confidence * 100.0,
        label.as_str()
    )
}

/// Compose the reply for a successful execution.
pub fn compose_response(
    target: &DatabaseEntry,
    plan: &QueryPlan,
    result: &ResultSet,
    analysis: &str,
) -> String {
    let description = if target.description.is_empty() {
        "No description"
    } else {
        target.description.as_str()
    };

    let mut out = format!("🎯 Database: {} ({})\n", target.id, description);
    out.push_str(&format!("🖥️ Host: {}\n", target.connection.host));
    out.push_str(&origin_line(plan));
    out.push('\n');

    if result.is_empty() {
        out.push_str("✅ Query executed successfully, no results.\n");
    } else {
        out.push_str(&format!("📊 Results ({} records):\n\n", result.len()));
        for (i, row) in result.rows.iter().take(MAX_RECORDS).enumerate() {
            out.push_str(&format_record(i + 1, row));
        }
        if result.len() > MAX_RECORDS {
            out.push_str(&format!(
                "📋 Showing {} of {} records\n\n",
                MAX_RECORDS,
                result.len()
            ));
        }
    }

    out.push_str(&format!("🧠 Expert analysis:\n{analysis}\n"));

    if plan.is_low_confidence() {
        out.push_str(LOW_CONFIDENCE_HINT);
    }

    if out.chars().count() > MAX_RESPONSE_CHARS {
        let mut cut = truncate_chars(&out, MAX_RESPONSE_CHARS).to_string();
        cut.push_str(TRUNCATED_NOTE);
        return cut;
    }
    out
}

/// Reply for a failed execution: backend message plus the offending query.
pub fn execution_error_response(message: &str, sql: &str) -> String {
    format!("❌ Error executing query: {message}\n\n🔧 Generated SQL:\n```\n{sql}\n```")
}
