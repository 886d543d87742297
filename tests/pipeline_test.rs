//! End-to-end tests of the coordinator with a scripted text generator and a
//! mock backend.

mod common;

use common::{MockBackend, Script, ScriptedGenerator, registry};
use db_chat_router::bot::{ConversationStore, Coordinator};
use db_chat_router::db::CannedQuery;
use db_chat_router::models::{BackendKind, QueryOrigin};
use std::sync::Arc;
use std::time::Duration;

fn coordinator(generator: Arc<ScriptedGenerator>, backend: Arc<MockBackend>) -> Coordinator {
    Coordinator::new(registry(), generator, backend)
}

fn status_rows() -> Arc<MockBackend> {
    MockBackend::rows(
        &["INSTANCE_NAME", "STATUS"],
        vec![vec![Some("brm"), Some("OPEN")]],
    )
}

#[tokio::test]
async fn test_predefined_status_query() {
    let generator = ScriptedGenerator::with_replies(&["Instance is open and healthy."]);
    let backend = status_rows();
    let bot = coordinator(generator.clone(), backend.clone());

    let response = bot.handle("chat-1", "BRM estado de la base").await;

    assert!(response.success, "unexpected failure: {}", response.text);
    let details = response.details.expect("details on success");
    assert_eq!(details.database, "BRM");
    assert_eq!(details.origin, QueryOrigin::Predefined);
    assert_eq!(details.confidence, 1.0);
    assert_eq!(details.row_count, 1);
    assert_eq!(
        backend.statements(),
        vec![CannedQuery::InstanceStatus.sql(BackendKind::Postgres).to_string()]
    );
    assert_eq!(*backend.hosts.lock().unwrap(), vec!["brm-host".to_string()]);
    assert!(response.text.contains("Instance is open and healthy."));
    assert!(response.text.contains("✅ STATUS: OPEN"));

    // Only the summarizer called the service
    assert_eq!(generator.prompts().len(), 1);
    assert_eq!(backend.close_count(), 1);
}

#[tokio::test]
async fn test_missing_target_then_clarified() {
    let generator = ScriptedGenerator::with_replies(&[
        "SELECT usename, client_addr FROM pg_stat_activity",
        "Two users connected.",
    ]);
    let backend = MockBackend::rows(
        &["USENAME", "CLIENT_ADDR"],
        vec![vec![Some("app"), None], vec![Some("batch"), Some("10.0.0.2")]],
    );
    let bot = coordinator(generator.clone(), backend.clone());

    let first = bot.handle("chat-42", "usuarios conectados").await;
    assert!(!first.success);
    assert!(first.text.contains("database name"));
    let state = bot.conversations().get("chat-42").await.expect("pending state");
    assert_eq!(state.attempt, 2);
    assert_eq!(state.original_text, "usuarios conectados");
    assert_eq!(backend.connect_count(), 0);

    let second = bot.handle("chat-42", "BRM").await;
    assert!(second.success, "unexpected failure: {}", second.text);
    assert!(bot.conversations().get("chat-42").await.is_none());

    let details = second.details.unwrap();
    assert_eq!(details.database, "BRM");
    assert_eq!(details.origin, QueryOrigin::Generated);
    assert_eq!(details.query, "SELECT usename, client_addr FROM pg_stat_activity");
    assert_eq!(details.row_count, 2);

    let prompts = generator.prompts();
    assert!(prompts[0].contains("Question: usuarios conectados\n"));
    assert!(second.text.contains("🔸 CLIENT_ADDR: NULL"));
}

#[tokio::test]
async fn test_second_attempt_without_target_fails_and_resets() {
    let backend = status_rows();
    let bot = coordinator(ScriptedGenerator::new(), backend.clone());

    let first = bot.handle("chat-7", "estado").await;
    assert!(!first.success);
    assert!(bot.conversations().get("chat-7").await.is_some());

    let second = bot.handle("chat-7", "nada").await;
    assert!(!second.success);
    assert!(second.text.contains("not found"));
    assert!(second.text.contains("estado, nada"));
    assert!(second.text.contains("Available databases"));
    assert!(bot.conversations().get("chat-7").await.is_none());

    // A third message starts over at attempt 1
    let third = bot.handle("chat-7", "otra cosa").await;
    assert!(third.text.contains("database name"));
    assert_eq!(bot.conversations().get("chat-7").await.unwrap().attempt, 2);
    assert_eq!(backend.connect_count(), 0);
}

#[tokio::test]
async fn test_conversations_do_not_share_state() {
    let bot = coordinator(ScriptedGenerator::with_replies(&["ok"]), status_rows());

    bot.handle("chat-a", "estado general").await;
    let other = bot.handle("chat-b", "BRM estado general").await;

    assert!(other.success);
    assert!(bot.conversations().get("chat-a").await.is_some());
    assert!(bot.conversations().get("chat-b").await.is_none());
}

#[tokio::test]
async fn test_template_routes_to_alias_target() {
    let generator = ScriptedGenerator::with_replies(&["No blocking detected."]);
    let backend = MockBackend::rows(&["PID", "BLOCKED_BY"], vec![]);
    let bot = coordinator(generator.clone(), backend.clone());

    let response = bot.handle("chat-1", "facturas bloqueos").await;

    assert!(response.success);
    let details = response.details.unwrap();
    assert_eq!(details.database, "SAP");
    assert_eq!(details.origin, QueryOrigin::TemplateMatched);
    assert_eq!(
        details.query,
        CannedQuery::BlockedSessions.sql(BackendKind::MySql)
    );
    assert_eq!(*backend.hosts.lock().unwrap(), vec!["sap-host".to_string()]);
    assert!(response.text.contains("no results"));
    assert!(generator.prompts()[0].contains("query returned no rows"));
}

#[tokio::test]
async fn test_unsafe_generated_query_uses_fallback() {
    let generator = ScriptedGenerator::with_replies(&["DELETE FROM users", "Clock looks right."]);
    let backend = MockBackend::rows(&["NOW"], vec![vec![Some("2024-05-01 10:00:00")]]);
    let bot = coordinator(generator, backend.clone());

    let response = bot.handle("chat-1", "BRM cuantas tablas hay").await;

    assert!(response.success);
    let details = response.details.unwrap();
    assert_eq!(details.origin, QueryOrigin::FallbackGenerated);
    assert_eq!(details.confidence, 0.5);
    assert_eq!(
        backend.statements(),
        vec![CannedQuery::CurrentTime.sql(BackendKind::Postgres).to_string()]
    );
    assert!(!backend.statements()[0].contains("DELETE"));
    assert!(response.text.contains("Tip:"));
}

#[tokio::test]
async fn test_execution_error_is_surfaced_with_query() {
    let backend = MockBackend::new(Script::Fail("relation \"v$instance\" does not exist".to_string()));
    let generator = ScriptedGenerator::new();
    let bot = coordinator(generator.clone(), backend.clone());

    let response = bot.handle("chat-1", "BRM estado de la base").await;

    assert!(!response.success);
    assert!(response.details.is_none());
    assert!(response.text.contains("Error executing query"));
    assert!(response.text.contains("relation \"v$instance\" does not exist"));
    assert!(response.text.contains(CannedQuery::InstanceStatus.sql(BackendKind::Postgres)));
    assert_eq!(backend.close_count(), 1);
    // No summary is requested for a failed execution
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn test_summary_service_down_still_answers() {
    let bot = coordinator(ScriptedGenerator::new(), status_rows());
    let response = bot.handle("chat-1", "BRM estado de la base").await;
    assert!(response.success);
    assert!(response.text.contains("automatic analysis unavailable"));
}

#[tokio::test]
async fn test_large_result_is_summarized_from_five_rows() {
    let rows = (0..7)
        .map(|i| vec![Some(if i % 2 == 0 { "ACTIVE" } else { "INACTIVE" })])
        .collect();
    let generator = ScriptedGenerator::with_replies(&["Mostly active sessions."]);
    let backend = MockBackend::rows(&["STATUS"], rows);
    let bot = coordinator(generator.clone(), backend);

    let response = bot.handle("chat-1", "BRM sesiones activas").await;

    assert!(response.success);
    assert_eq!(response.details.unwrap().row_count, 7);
    assert!(response.text.contains("📋 Showing 5 of 7 records"));

    let prompt = &generator.prompts()[0];
    assert_eq!(prompt.matches("STATUS=").count(), 5);
    assert!(prompt.contains("(showing 5 of 7 rows)"));
}

#[tokio::test]
async fn test_expired_pending_state_is_ignored() {
    let store = Arc::new(ConversationStore::new(Duration::from_millis(30)));
    let backend = status_rows();
    let bot = coordinator(ScriptedGenerator::with_replies(&["ok"]), backend.clone())
        .with_conversation_store(store.clone());

    bot.handle("chat-1", "estado de la base").await;
    assert!(store.get("chat-1").await.is_some());

    tokio::time::sleep(Duration::from_millis(80)).await;

    // Treated as a fresh attempt 1, not as the second attempt
    let response = bot.handle("chat-1", "sin base").await;
    assert!(response.text.contains("database name"));
    assert_eq!(backend.connect_count(), 0);
}

#[tokio::test]
async fn test_start_inside_a_question_is_not_a_greeting() {
    let backend = status_rows();
    let bot = coordinator(ScriptedGenerator::new(), backend.clone());

    let response = bot.handle("chat-start", "when did BRM instance start").await;

    assert!(!response.text.contains("👋"));
    assert_eq!(backend.connect_count(), 1);
    let details = response.details.expect("details on success");
    assert_eq!(details.database, "BRM");
}

#[tokio::test]
async fn test_greeting_does_not_touch_pending_state() {
    let bot = coordinator(ScriptedGenerator::new(), status_rows());
    bot.handle("chat-1", "estado").await;

    let greeting = bot.handle("chat-1", "hola").await;
    assert!(greeting.success);
    assert_eq!(bot.conversations().get("chat-1").await.unwrap().attempt, 2);
}

#[tokio::test]
async fn test_panicking_stage_clears_state_and_returns_generic_error() {
    struct Exploding;

    #[async_trait::async_trait]
    impl db_chat_router::db::Backend for Exploding {
        async fn connect(
            &self,
            _descriptor: &db_chat_router::models::ConnectionDescriptor,
        ) -> db_chat_router::BotResult<Box<dyn db_chat_router::db::BackendSession>> {
            panic!("driver bug");
        }
    }

    let bot = Coordinator::new(registry(), ScriptedGenerator::new(), Arc::new(Exploding));
    bot.handle("chat-1", "usuarios conectados").await;
    assert!(bot.conversations().get("chat-1").await.is_some());

    let response = bot.handle("chat-1", "brm").await;
    assert!(!response.success);
    assert!(response.text.contains("internal error"));
    assert!(bot.conversations().get("chat-1").await.is_none());
}
