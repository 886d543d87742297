//! Query synthesis.
//!
//! Three stages, first success wins:
//! 1. hand-written templates picked by keyword sets,
//! 2. the text-generation service, validated as read-only,
//! 3. a canned fallback picked by keywords.
//!
//! [`QuerySynthesizer::synthesize`] always returns a plan.

use crate::db::CannedQuery;
use crate::error::{BotError, BotResult};
use crate::handlers::sql_validator::validate_readonly_for;
use crate::handlers::text::{contains_any, normalize};
use crate::llm::intent::MonitoringCategory;
use crate::llm::{GenerationRequest, IntentAnalyzer, TextGenerator, strip_code_fences};
use crate::models::{
    BackendKind, DatabaseEntry, FALLBACK_CONFIDENCE, GENERATED_CONFIDENCE, QueryOrigin, QueryPlan,
    TEMPLATE_CONFIDENCE,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SQL_MAX_TOKENS: u32 = 150;

const TABLESPACE_WORDS: &[&str] = &["tablespace", "tbs"];
const USAGE_WORDS: &[&str] = &["uso", "usage", "utiliza", "ocupado", "espacio", "used", "free", "libre"];
const SESSION_WORDS: &[&str] = &["sesion", "session", "usuario", "user", "conectad", "connected"];
const TODAY_WORDS: &[&str] = &["hoy", "today"];
const ACTIVE_WORDS: &[&str] = &["activ"];
const LOCK_WORDS: &[&str] = &["bloque", "lock"];
const PROCESS_WORDS: &[&str] = &["proceso", "process"];
const STATUS_WORDS: &[&str] = &["estado", "status", "estatus"];

/// Produces a query plan for free text against one target.
#[derive(Clone)]
pub struct QuerySynthesizer {
    generator: Arc<dyn TextGenerator>,
    intent: Option<IntentAnalyzer>,
}

impl QuerySynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            intent: None,
        }
    }

    /// Enable intent analysis hints in the generation prompt.
    pub fn with_intent_analysis(mut self, analyzer: IntentAnalyzer) -> Self {
        self.intent = Some(analyzer);
        self
    }

    pub async fn synthesize(&self, text: &str, target: &DatabaseEntry) -> QueryPlan {
        let kind = target.connection.kind;
        let normalized = normalize(text);

        if let Some(query) = match_template(&normalized) {
            info!(template = query.name(), target = %target.id, "Template matched");
            return QueryPlan::new(query.sql(kind), QueryOrigin::TemplateMatched, TEMPLATE_CONFIDENCE)
                .with_name(query.name());
        }

        match self.generate(text, &normalized, kind).await {
            Ok(sql) => {
                info!(target = %target.id, "Query generated");
                QueryPlan::new(sql, QueryOrigin::Generated, GENERATED_CONFIDENCE)
            }
            Err(e) => {
                let query = fallback_query(&normalized);
                warn!(error = %e, fallback = query.name(), "Generation failed; using fallback query");
                QueryPlan::new(
                    query.sql(kind),
                    QueryOrigin::FallbackGenerated,
                    FALLBACK_CONFIDENCE,
                )
                .with_name(query.name())
            }
        }
    }

    async fn generate(&self, text: &str, normalized: &str, kind: BackendKind) -> BotResult<String> {
        let hints = match &self.intent {
            Some(analyzer) => analyzer.prompt_hints(text, kind).await,
            None => String::new(),
        };
        let dialect = kind.display_name();
        let prompt = format!(
            "You are an expert in {dialect} SQL. Generate ONLY the {dialect} SQL query that answers \
             this question. The query must be a single read-only SELECT statement.\n\
             {context}{hints}\n\
             Question: {text}\n\
             SQL:",
            context = context_block(normalized, kind),
        );
        let system = format!(
            "You generate read-only {dialect} monitoring queries. Reply with the SQL text only."
        );

        let raw = self
            .generator
            .generate(GenerationRequest::new(system, prompt, SQL_MAX_TOKENS))
            .await?;
        let sql = clean_generated_sql(&raw);
        debug!(sql = %sql, "Generated query text");

        if sql.is_empty() {
            return Err(BotError::generation("empty query text"));
        }
        validate_readonly_for(&sql, kind)?;
        Ok(sql)
    }
}

/// Template keyed by keyword sets over normalized text.
pub fn match_template(normalized: &str) -> Option<CannedQuery> {
    let session = contains_any(normalized, SESSION_WORDS);

    if contains_any(normalized, TABLESPACE_WORDS) && contains_any(normalized, USAGE_WORDS) {
        return Some(CannedQuery::TablespaceUsage);
    }
    if session && contains_any(normalized, TODAY_WORDS) {
        return Some(CannedQuery::SessionsToday);
    }
    if session && contains_any(normalized, ACTIVE_WORDS) {
        return Some(CannedQuery::ActiveSessions);
    }
    if contains_any(normalized, LOCK_WORDS) {
        return Some(CannedQuery::BlockedSessions);
    }
    None
}

/// Canned query used when generation fails.
pub fn fallback_query(normalized: &str) -> CannedQuery {
    let session = contains_any(normalized, SESSION_WORDS);

    if contains_any(normalized, STATUS_WORDS) {
        CannedQuery::InstanceStatus
    } else if contains_any(normalized, TABLESPACE_WORDS) {
        CannedQuery::TablespaceUsage
    } else if session && contains_any(normalized, TODAY_WORDS) {
        CannedQuery::SessionsToday
    } else if session {
        CannedQuery::ActiveSessions
    } else {
        CannedQuery::CurrentTime
    }
}

/// Prompt context chosen by keyword sniffing.
fn context_block(normalized: &str, kind: BackendKind) -> String {
    let category = if contains_any(normalized, TABLESPACE_WORDS) {
        MonitoringCategory::Tablespaces
    } else if contains_any(normalized, SESSION_WORDS) {
        MonitoringCategory::Sessions
    } else if contains_any(normalized, PROCESS_WORDS) {
        MonitoringCategory::Performance
    } else if contains_any(normalized, STATUS_WORDS) {
        MonitoringCategory::Instance
    } else {
        return String::new();
    };

    let views = category.recommended_views(kind);
    if views.is_empty() {
        return String::new();
    }
    format!(
        "-- {} questions are answered from: {}\n",
        category.as_str(),
        views.join(", ")
    )
}

/// Strip markdown fences and a trailing statement terminator.
pub fn clean_generated_sql(raw: &str) -> String {
    let sql = strip_code_fences(raw);
    let sql = sql.trim();
    sql.strip_suffix(';').unwrap_or(sql).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Scripted {
        reply: BotResult<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(BotError::generation("service down")),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, request: GenerationRequest) -> BotResult<String> {
            self.prompts.lock().unwrap().push(request.prompt);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(BotError::generation(e.to_string())),
            }
        }
    }

    fn target() -> DatabaseEntry {
        serde_json::from_str(
            r#"{"id": "BRM", "connection": {"user": "u", "host": "h", "service_name": "s"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_templates() {
        assert_eq!(
            match_template("uso de tablespaces"),
            Some(CannedQuery::TablespaceUsage)
        );
        assert_eq!(
            match_template("usuarios que iniciaron sesion hoy"),
            Some(CannedQuery::SessionsToday)
        );
        assert_eq!(
            match_template("sesiones activas"),
            Some(CannedQuery::ActiveSessions)
        );
        assert_eq!(match_template("hay bloqueos"), Some(CannedQuery::BlockedSessions));
        assert_eq!(match_template("tablespaces"), None);
    }

    #[test]
    fn test_fallback_selection() {
        assert_eq!(fallback_query("estado general"), CannedQuery::InstanceStatus);
        assert_eq!(fallback_query("tablespaces"), CannedQuery::TablespaceUsage);
        assert_eq!(fallback_query("sesiones de hoy"), CannedQuery::SessionsToday);
        assert_eq!(fallback_query("sesiones"), CannedQuery::ActiveSessions);
        assert_eq!(fallback_query("algo raro"), CannedQuery::CurrentTime);
    }

    #[test]
    fn test_clean_generated_sql() {
        assert_eq!(
            clean_generated_sql("```sql\nSELECT * FROM pg_stat_activity;\n```"),
            "SELECT * FROM pg_stat_activity"
        );
        assert_eq!(clean_generated_sql("  SELECT 1 ;  "), "SELECT 1");
    }

    #[tokio::test]
    async fn test_template_skips_service() {
        let generator = Scripted::ok("SELECT 1");
        let synth = QuerySynthesizer::new(generator.clone());
        let plan = synth.synthesize("uso de tablespace", &target()).await;
        assert_eq!(plan.origin, QueryOrigin::TemplateMatched);
        assert_eq!(plan.confidence, TEMPLATE_CONFIDENCE);
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generated_query_is_cleaned_and_accepted() {
        let generator = Scripted::ok("```sql\nSELECT datname FROM pg_database;\n```");
        let synth = QuerySynthesizer::new(generator.clone());
        let plan = synth.synthesize("lista de bases", &target()).await;
        assert_eq!(plan.origin, QueryOrigin::Generated);
        assert_eq!(plan.sql, "SELECT datname FROM pg_database");
        assert_eq!(plan.confidence, GENERATED_CONFIDENCE);

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("PostgreSQL"));
        assert!(prompts[0].contains("lista de bases"));
    }

    #[tokio::test]
    async fn test_unsafe_generated_query_falls_back() {
        let synth = QuerySynthesizer::new(Scripted::ok("DROP TABLE users"));
        let plan = synth.synthesize("estado general por favor", &target()).await;
        assert_eq!(plan.origin, QueryOrigin::FallbackGenerated);
        assert_eq!(plan.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(plan.name.as_deref(), Some("instance_status"));
    }

    #[tokio::test]
    async fn test_service_failure_falls_back() {
        let synth = QuerySynthesizer::new(Scripted::failing());
        let plan = synth.synthesize("que hora es", &target()).await;
        assert_eq!(plan.origin, QueryOrigin::FallbackGenerated);
        assert_eq!(
            plan.sql,
            CannedQuery::CurrentTime.sql(BackendKind::Postgres)
        );
    }

    #[tokio::test]
    async fn test_context_block_reaches_prompt() {
        let generator = Scripted::ok("SELECT 1");
        let synth = QuerySynthesizer::new(generator.clone());
        synth.synthesize("procesos en ejecucion", &target()).await;
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("pg_stat_database"));
    }
}
