//! Predefined-query lookup.
//!
//! An ordered table of phrase fragments mapped to ready-made queries. Table
//! order is priority and the first hit wins. A fragment hits when it is a
//! substring of the input, both in canonical form, so input already stripped
//! of connector words (`"estado base"`) still hits `"estado de la base"`.

use crate::db::CannedQuery;
use crate::handlers::text::canonical;
use crate::models::{BackendKind, QueryPlan};
use tracing::debug;

/// One row of the predefined table.
#[derive(Debug, Clone)]
pub struct PredefinedQuery {
    pub name: &'static str,
    pub query: CannedQuery,
    fragments: Vec<String>,
}

impl PredefinedQuery {
    fn new(query: CannedQuery, fragments: &[&str]) -> Self {
        Self {
            name: query.name(),
            query,
            fragments: fragments.iter().map(|f| canonical(f)).collect(),
        }
    }

    /// Build the plan for a target of the given backend kind.
    pub fn plan(&self, kind: BackendKind) -> QueryPlan {
        QueryPlan::predefined(self.name, self.query.sql(kind))
    }

    fn hits(&self, canonical_text: &str) -> bool {
        self.fragments
            .iter()
            .any(|f| !f.is_empty() && canonical_text.contains(f.as_str()))
    }
}

const INSTANCE_STATUS_FRAGMENTS: &[&str] = &[
    "estado de la base",
    "estado de la base de datos",
    "estado general",
    "estado del sistema",
    "revisar base de datos",
    "database status",
    "instance status",
];

const RESOURCE_LIMIT_FRAGMENTS: &[&str] = &[
    "estatus de procesos",
    "estatus de sesiones",
    "umbrales procesos",
    "umbrales de procesos",
    "umbrales sesiones",
    "limite de sesiones",
    "limite de procesos",
    "session limits",
    "process limits",
];

/// Matches free text against the predefined table.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    table: Vec<PredefinedQuery>,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self {
            table: vec![
                PredefinedQuery::new(CannedQuery::InstanceStatus, INSTANCE_STATUS_FRAGMENTS),
                PredefinedQuery::new(CannedQuery::ResourceLimits, RESOURCE_LIMIT_FRAGMENTS),
            ],
        }
    }

    /// First table entry with a fragment contained in `text`.
    pub fn find_match(&self, text: &str) -> Option<&PredefinedQuery> {
        let canonical_text = canonical(text);
        if canonical_text.is_empty() {
            return None;
        }
        let hit = self.table.iter().find(|entry| entry.hits(&canonical_text));
        match hit {
            Some(entry) => debug!(name = entry.name, "Predefined query matched"),
            None => debug!(text = %canonical_text, "No predefined query matched"),
        }
        hit
    }

    pub fn entries(&self) -> &[PredefinedQuery] {
        &self.table
    }
}
