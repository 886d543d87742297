//! Backend connections.
//!
//! The executor talks to target databases through the [`Backend`] and
//! [`BackendSession`] traits so that the pipeline can be exercised without a
//! live server. [`SqlxBackend`] is the production implementation: one
//! dedicated `sqlx` connection per session, never pooled, never shared.

use crate::db::types::RowToText;
use crate::error::{BotError, BotResult};
use crate::models::{BackendKind, ConnectionDescriptor};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::mysql::MySqlConnection;
use sqlx::postgres::PgConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Column, ConnectOptions, Connection, Executor, Statement};
use std::str::FromStr;
use tracing::{debug, warn};

/// What a single statement produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementOutcome {
    /// The statement has a result-set shape; every cell already rendered.
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    },
    /// The statement produced no result set.
    NoResultSet { rows_affected: u64 },
}

/// Opens sessions against target databases.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> BotResult<Box<dyn BackendSession>>;
}

/// One open connection.
#[async_trait]
pub trait BackendSession: Send {
    /// Run exactly one statement.
    async fn run(&mut self, sql: &str) -> BotResult<StatementOutcome>;

    /// Commit any implicit transaction.
    async fn commit(&mut self) -> BotResult<()>;

    /// Release the connection. Failures are logged, never returned.
    async fn close(self: Box<Self>);
}

/// [`Backend`] over dedicated `sqlx` connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxBackend;

impl SqlxBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for SqlxBackend {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> BotResult<Box<dyn BackendSession>> {
        let url = descriptor.connection_url().map_err(|e| {
            BotError::connection(e, "Check the connection descriptor in the catalog")
        })?;

        debug!(
            backend = %descriptor.kind,
            dsn = %descriptor.dsn(),
            role = %descriptor.role,
            "Opening backend connection"
        );

        let mut session = match descriptor.kind {
            BackendKind::Postgres => SqlxSession::Postgres(PgConnection::connect(&url).await?),
            BackendKind::MySql => SqlxSession::MySql(MySqlConnection::connect(&url).await?),
            BackendKind::SQLite => {
                // Target databases are never created on demand
                let options = SqliteConnectOptions::from_str(&url)?
                    .create_if_missing(false)
                    .read_only(true);
                SqlxSession::SQLite(options.connect().await?)
            }
        };

        if descriptor.role.is_elevated() {
            if let Err(e) = session.assume_role(descriptor).await {
                session.close_quietly().await;
                return Err(e);
            }
        }

        Ok(Box::new(session))
    }
}

enum SqlxSession {
    Postgres(PgConnection),
    MySql(MySqlConnection),
    SQLite(SqliteConnection),
}

impl SqlxSession {
    /// Switch to the descriptor's elevated backend role, if one is named.
    async fn assume_role(&mut self, descriptor: &ConnectionDescriptor) -> BotResult<()> {
        let Some(role) = descriptor.elevated_role.as_deref() else {
            warn!(
                role = %descriptor.role,
                dsn = %descriptor.dsn(),
                "Elevated access requested without elevated_role; connecting with login privileges"
            );
            return Ok(());
        };

        let statement = match self {
            Self::Postgres(_) => format!("SET ROLE {}", quote_identifier(role, '"')),
            Self::MySql(_) => format!("SET ROLE {}", quote_identifier(role, '`')),
            Self::SQLite(_) => {
                warn!(role, "SQLite has no roles; ignoring elevated access");
                return Ok(());
            }
        };

        debug!(role, "Assuming elevated role");
        match self {
            Self::Postgres(conn) => {
                conn.execute(statement.as_str()).await?;
            }
            Self::MySql(conn) => {
                conn.execute(statement.as_str()).await?;
            }
            Self::SQLite(_) => {}
        }
        Ok(())
    }

    async fn close_quietly(self) {
        let result = match self {
            Self::Postgres(conn) => conn.close().await,
            Self::MySql(conn) => conn.close().await,
            Self::SQLite(conn) => conn.close().await,
        };
        if let Err(e) = result {
            warn!(error = %e, "Error closing backend connection");
        }
    }
}

/// Quote an identifier, doubling any embedded quote character.
fn quote_identifier(name: &str, quote: char) -> String {
    let doubled = format!("{quote}{quote}");
    format!("{quote}{}{quote}", name.replace(quote, &doubled))
}

#[async_trait]
impl BackendSession for SqlxSession {
    async fn run(&mut self, sql: &str) -> BotResult<StatementOutcome> {
        match self {
            Self::Postgres(conn) => postgres::run(conn, sql).await,
            Self::MySql(conn) => mysql::run(conn, sql).await,
            Self::SQLite(conn) => sqlite::run(conn, sql).await,
        }
    }

    async fn commit(&mut self) -> BotResult<()> {
        // Dedicated sqlx connections run in autocommit mode
        debug!("Commit requested on autocommit connection");
        Ok(())
    }

    async fn close(self: Box<Self>) {
        (*self).close_quietly().await;
    }
}

// Each module below provides the same interface adapted to its backend.
// Column names come from preparing the statement; rows are fetched with the
// simple protocol so every value arrives in the server's text form.

mod postgres {
    use super::*;

    pub async fn run(conn: &mut PgConnection, sql: &str) -> BotResult<StatementOutcome> {
        let statement = (&mut *conn).prepare(sql).await?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        if columns.is_empty() {
            let done = (&mut *conn).execute(sql).await?;
            return Ok(StatementOutcome::NoResultSet {
                rows_affected: done.rows_affected(),
            });
        }

        let rows = (&mut *conn)
            .fetch(sql)
            .map_ok(|row| row.to_text_cells())
            .try_collect::<Vec<_>>()
            .await?;
        Ok(StatementOutcome::Rows { columns, rows })
    }
}

mod mysql {
    use super::*;

    pub async fn run(conn: &mut MySqlConnection, sql: &str) -> BotResult<StatementOutcome> {
        let statement = (&mut *conn).prepare(sql).await?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        if columns.is_empty() {
            let done = (&mut *conn).execute(sql).await?;
            return Ok(StatementOutcome::NoResultSet {
                rows_affected: done.rows_affected(),
            });
        }

        let rows = (&mut *conn)
            .fetch(sql)
            .map_ok(|row| row.to_text_cells())
            .try_collect::<Vec<_>>()
            .await?;
        Ok(StatementOutcome::Rows { columns, rows })
    }
}

mod sqlite {
    use super::*;

    pub async fn run(conn: &mut SqliteConnection, sql: &str) -> BotResult<StatementOutcome> {
        let statement = (&mut *conn).prepare(sql).await?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        if columns.is_empty() {
            let done = (&mut *conn).execute(sql).await?;
            return Ok(StatementOutcome::NoResultSet {
                rows_affected: done.rows_affected(),
            });
        }

        let rows = (&mut *conn)
            .fetch(sql)
            .map_ok(|row| row.to_text_cells())
            .try_collect::<Vec<_>>()
            .await?;
        Ok(StatementOutcome::Rows { columns, rows })
    }
}
