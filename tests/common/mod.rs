//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use db_chat_router::db::{Backend, BackendSession, DatabaseRegistry, StatementOutcome};
use db_chat_router::error::{BotError, BotResult};
use db_chat_router::llm::{GenerationRequest, TextGenerator};
use db_chat_router::models::ConnectionDescriptor;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const CATALOG: &str = r#"{
    "databases": [
        {
            "id": "BRM",
            "description": "Billing",
            "aliases": ["brm", "consultas"],
            "connection": {"user": "monitor", "password": "pw", "host": "brm-host", "service_name": "brm"}
        },
        {
            "id": "SAP",
            "description": "ERP",
            "aliases": ["sap", "facturas"],
            "connection": {"kind": "mysql", "user": "monitor", "password": "pw", "host": "sap-host", "service_name": "sap", "role": "sysdba"}
        }
    ]
}"#;

pub fn registry() -> Arc<DatabaseRegistry> {
    Arc::new(DatabaseRegistry::from_json(CATALOG).unwrap())
}

/// Replies from a queue; an empty queue means the service is down.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<BotResult<String>>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_replies(replies: &[&str]) -> Arc<Self> {
        let generator = Self::default();
        {
            let mut queue = generator.replies.lock().unwrap();
            for reply in replies {
                queue.push_back(Ok(reply.to_string()));
            }
        }
        Arc::new(generator)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> BotResult<String> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BotError::generation("service unavailable")))
    }
}

/// What every session of a [`MockBackend`] does.
#[derive(Clone)]
pub enum Script {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    },
    NoResultSet,
    Fail(String),
    ConnectFail(String),
    Hang,
}

/// Backend double counting opened and closed sessions.
pub struct MockBackend {
    script: Script,
    pub connects: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub commits: Arc<AtomicUsize>,
    pub statements: Arc<Mutex<Vec<String>>>,
    pub hosts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            commits: Arc::new(AtomicUsize::new(0)),
            statements: Arc::new(Mutex::new(Vec::new())),
            hosts: Mutex::new(Vec::new()),
        })
    }

    pub fn rows(columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> Arc<Self> {
        Self::new(Script::Rows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
        })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> BotResult<Box<dyn BackendSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.hosts.lock().unwrap().push(descriptor.host.clone());
        if let Script::ConnectFail(message) = &self.script {
            return Err(BotError::connection(message.clone(), "check the host"));
        }
        Ok(Box::new(MockSession {
            script: self.script.clone(),
            closes: self.closes.clone(),
            commits: self.commits.clone(),
            statements: self.statements.clone(),
        }))
    }
}

struct MockSession {
    script: Script,
    closes: Arc<AtomicUsize>,
    commits: Arc<AtomicUsize>,
    statements: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BackendSession for MockSession {
    async fn run(&mut self, sql: &str) -> BotResult<StatementOutcome> {
        self.statements.lock().unwrap().push(sql.to_string());
        match &self.script {
            Script::Rows { columns, rows } => Ok(StatementOutcome::Rows {
                columns: columns.clone(),
                rows: rows.clone(),
            }),
            Script::NoResultSet => Ok(StatementOutcome::NoResultSet { rows_affected: 0 }),
            Script::Fail(message) => Err(BotError::database(message.clone(), None, "check the query")),
            Script::ConnectFail(_) => unreachable!("session never opened"),
            Script::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn commit(&mut self) -> BotResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(self: Box<Self>) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
