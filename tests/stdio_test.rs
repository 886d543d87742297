//! Stdio transport: one reply per non-blank input line.

mod common;

use common::{MockBackend, ScriptedGenerator, registry};
use db_chat_router::bot::Coordinator;
use db_chat_router::transport::StdioTransport;
use std::sync::Arc;

#[tokio::test]
async fn test_serve_answers_each_line() {
    let generator = ScriptedGenerator::with_replies(&["All good."]);
    let backend = MockBackend::rows(&["STATUS"], vec![vec![Some("OPEN")]]);
    let coordinator = Arc::new(Coordinator::new(registry(), generator, backend.clone()));
    let transport = StdioTransport::new(coordinator.clone(), "stdio");

    let input = b"hola\n\n   \nBRM estado de la base\n";
    let mut output = Vec::new();
    transport.serve(&input[..], &mut output).await.unwrap();

    let output = String::from_utf8(output).unwrap();
    let replies: Vec<&str> = output.split("\n\n").filter(|s| !s.is_empty()).collect();
    assert!(output.contains("👋"));
    assert!(output.contains("🎯 Database: BRM"));
    assert!(output.contains("All good."));
    assert!(output.ends_with("\n\n"));
    assert!(replies.len() >= 2);
    assert_eq!(backend.connect_count(), 1);
}

#[tokio::test]
async fn test_serve_keeps_one_conversation() {
    let generator = ScriptedGenerator::new();
    let backend = MockBackend::rows(&["STATUS"], vec![vec![Some("OPEN")]]);
    let coordinator = Arc::new(Coordinator::new(registry(), generator, backend.clone()));
    let transport = StdioTransport::new(coordinator.clone(), "console");

    let input = b"estado de la base\nBRM\n";
    let mut output = Vec::new();
    transport.serve(&input[..], &mut output).await.unwrap();

    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("I need the database name"));
    assert!(output.contains("🎯 Database: BRM"));
    assert!(coordinator.conversations().get("console").await.is_none());
    assert_eq!(backend.connect_count(), 1);
}

#[tokio::test]
async fn test_serve_empty_input() {
    let generator = ScriptedGenerator::new();
    let backend = MockBackend::rows(&["X"], vec![]);
    let coordinator = Arc::new(Coordinator::new(registry(), generator, backend.clone()));
    let transport = StdioTransport::new(coordinator, "stdio");

    let mut output = Vec::new();
    transport.serve(&b""[..], &mut output).await.unwrap();
    assert!(output.is_empty());
    assert_eq!(backend.connect_count(), 0);
}
