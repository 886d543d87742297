//! Intent analysis.
//!
//! Asks the text-generation service for a structured description of what the
//! user wants, falling back to keyword heuristics, and maps it onto a
//! monitoring category. The category's catalog views are handed to the query
//! synthesizer as prompt hints. The stage never fails.

use crate::handlers::text::{contains_any, normalize};
use crate::llm::{GenerationRequest, TextGenerator, strip_code_fences};
use crate::models::BackendKind;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const INTENT_MAX_TOKENS: u32 = 300;

const INTENT_SYSTEM: &str = "You are an expert database administrator. Analyze monitoring \
questions and reply ONLY with valid JSON, no explanations.";

/// Structured reading of a user question.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IntentAnalysis {
    #[serde(default, alias = "objetivo_principal")]
    pub goal: String,
    #[serde(default, alias = "entidades_involucradas")]
    pub entities: Vec<String>,
    #[serde(default, alias = "acciones_solicitadas")]
    pub actions: Vec<String>,
    #[serde(default, alias = "filtros_temporales")]
    pub time_filters: Vec<String>,
    #[serde(default, alias = "metricas_esperadas")]
    pub metrics: Vec<String>,
}

/// Monitoring area a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringCategory {
    Tablespaces,
    Sessions,
    Performance,
    Locks,
    Instance,
    General,
}

impl MonitoringCategory {
    fn from_entity(entity: &str) -> Option<Self> {
        let entity = normalize(entity);
        match entity.as_str() {
            "tablespace" | "tablespaces" | "espacio" | "storage" | "space" => Some(Self::Tablespaces),
            "sesion" | "sesiones" | "session" | "sessions" | "usuario" | "user" | "conectado" => {
                Some(Self::Sessions)
            }
            "proceso" | "procesos" | "process" | "processes" => Some(Self::Performance),
            "bloqueo" | "bloqueos" | "lock" | "locks" => Some(Self::Locks),
            "instancia" | "instance" | "base" | "database" => Some(Self::Instance),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tablespaces => "tablespaces",
            Self::Sessions => "sessions",
            Self::Performance => "performance",
            Self::Locks => "locks",
            Self::Instance => "instance",
            Self::General => "general",
        }
    }

    /// Catalog views worth querying for this category.
    pub fn recommended_views(&self, kind: BackendKind) -> &'static [&'static str] {
        match (self, kind) {
            (Self::Tablespaces, BackendKind::Postgres) => &["pg_tablespace", "pg_database", "pg_class"],
            (Self::Sessions, BackendKind::Postgres) => &["pg_stat_activity"],
            (Self::Performance, BackendKind::Postgres) => {
                &["pg_stat_database", "pg_stat_bgwriter", "pg_settings"]
            }
            (Self::Locks, BackendKind::Postgres) => &["pg_locks", "pg_stat_activity"],
            (Self::Instance, BackendKind::Postgres) => &["pg_database", "pg_settings"],

            (Self::Tablespaces, BackendKind::MySql) => {
                &["information_schema.TABLES", "information_schema.FILES"]
            }
            (Self::Sessions, BackendKind::MySql) => {
                &["information_schema.PROCESSLIST", "performance_schema.threads"]
            }
            (Self::Performance, BackendKind::MySql) => {
                &["performance_schema.global_status", "performance_schema.global_variables"]
            }
            (Self::Locks, BackendKind::MySql) => {
                &["performance_schema.data_locks", "performance_schema.data_lock_waits"]
            }
            (Self::Instance, BackendKind::MySql) => &["performance_schema.global_status"],

            (Self::Tablespaces, BackendKind::SQLite) => &["pragma_database_list", "pragma_page_count"],
            (Self::Instance, BackendKind::SQLite) | (Self::Performance, BackendKind::SQLite) => {
                &["sqlite_master", "pragma_page_count", "pragma_page_size"]
            }
            (Self::Sessions, BackendKind::SQLite) | (Self::Locks, BackendKind::SQLite) => &[],

            (Self::General, _) => &[],
        }
    }
}

impl IntentAnalysis {
    /// Keyword reading of `text`, used when the service is unavailable.
    pub fn heuristic(text: &str) -> Self {
        let lower = normalize(text);

        let mut entities = Vec::new();
        if contains_any(&lower, &["tablespace", "tbs", "espacio", "space"]) {
            entities.push("tablespace".to_string());
        }
        if contains_any(&lower, &["sesion", "session", "usuario", "user", "conectado"]) {
            entities.push("session".to_string());
        }
        if contains_any(&lower, &["proceso", "process"]) {
            entities.push("process".to_string());
        }
        if contains_any(&lower, &["bloqueo", "lock", "bloqueado"]) {
            entities.push("lock".to_string());
        }

        let mut actions = Vec::new();
        if contains_any(&lower, &["uso", "utiliza", "ocupado", "usage", "used"]) {
            actions.push("check_usage".to_string());
        }
        if contains_any(&lower, &["estado", "status"]) {
            actions.push("check_status".to_string());
        }
        if contains_any(&lower, &["listar", "mostrar", "ver ", "list", "show"]) {
            actions.push("list".to_string());
        }

        let time_filters = if contains_any(&lower, &["hoy", "actual", "today", "current"]) {
            vec!["current".to_string()]
        } else {
            Vec::new()
        };

        let goal = if entities.is_empty() {
            "general information".to_string()
        } else {
            format!("query {}", entities.join(", "))
        };

        Self {
            goal,
            entities,
            actions,
            time_filters,
            metrics: vec!["usage".to_string(), "status".to_string()],
        }
    }

    /// First entity that maps to a known category.
    pub fn category(&self) -> MonitoringCategory {
        self.entities
            .iter()
            .find_map(|e| MonitoringCategory::from_entity(e))
            .unwrap_or(MonitoringCategory::General)
    }

    /// Heuristic certainty of the reading, in [0.5, 1.0].
    pub fn confidence(&self) -> f64 {
        let mut confidence = 0.5;
        confidence += (self.entities.len() as f64 * 0.15).min(0.3);
        confidence += (self.actions.len() as f64 * 0.1).min(0.2);
        if self.category() != MonitoringCategory::General {
            confidence += 0.2;
        }
        confidence.min(1.0)
    }
}

/// Runs intent analysis against a text generator.
#[derive(Clone)]
pub struct IntentAnalyzer {
    generator: Arc<dyn TextGenerator>,
}

impl IntentAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn analyze(&self, text: &str) -> IntentAnalysis {
        let prompt = format!(
            "Analyze this database monitoring question and return a JSON object.\n\n\
             QUESTION: \"{text}\"\n\n\
             Return ONLY JSON with this structure:\n\
             {{\n\
             \x20 \"goal\": \"what the user wants to know\",\n\
             \x20 \"entities\": [\"tablespace\", \"session\", \"process\", \"lock\", \"instance\"],\n\
             \x20 \"actions\": [\"list\", \"check_usage\", \"check_status\"],\n\
             \x20 \"time_filters\": [\"today\", \"current\"],\n\
             \x20 \"metrics\": [\"usage\", \"count\", \"status\"]\n\
             }}\n\nJSON:"
        );

        let request = GenerationRequest::new(INTENT_SYSTEM, prompt, INTENT_MAX_TOKENS);
        match self.generator.generate(request).await {
            Ok(raw) => match parse_intent(&raw) {
                Some(analysis) => {
                    debug!(category = analysis.category().as_str(), "Intent analyzed");
                    analysis
                }
                None => {
                    warn!("Intent response was not valid JSON; using keyword analysis");
                    IntentAnalysis::heuristic(text)
                }
            },
            Err(e) => {
                warn!(error = %e, "Intent analysis unavailable; using keyword analysis");
                IntentAnalysis::heuristic(text)
            }
        }
    }

    /// Prompt block describing the question's category for the synthesizer.
    pub async fn prompt_hints(&self, text: &str, kind: BackendKind) -> String {
        let analysis = self.analyze(text).await;
        hints_for(&analysis, kind)
    }
}

/// Render an analysis as a prompt block; empty for the general category.
pub fn hints_for(analysis: &IntentAnalysis, kind: BackendKind) -> String {
    let category = analysis.category();
    let views = category.recommended_views(kind);
    if category == MonitoringCategory::General || views.is_empty() {
        return String::new();
    }

    let mut hints = format!(
        "-- Intent: {} (category: {})\n-- Recommended views: {}\n",
        analysis.goal,
        category.as_str(),
        views.join(", ")
    );
    if !analysis.time_filters.is_empty() {
        hints.push_str(&format!(
            "-- Time filters: {}\n",
            analysis.time_filters.join(", ")
        ));
    }
    hints
}

/// Extract the outermost JSON object from a service reply.
fn parse_intent(raw: &str) -> Option<IntentAnalysis> {
    let cleaned = strip_code_fences(raw);
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&cleaned[start..=end]).ok()
}
