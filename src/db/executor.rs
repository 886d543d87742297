//! Query execution engine.
//!
//! Every call opens its own connection through a [`Backend`], runs exactly one
//! statement and closes the connection before returning, whatever the outcome.
//! Connect and execution are each bounded by a timeout; all failures come back
//! as [`BotError::Execution`] carrying the backend's message. Nothing is
//! retried.

use crate::db::backend::{Backend, StatementOutcome};
use crate::error::{BotError, BotResult};
use crate::models::{ConnectionDescriptor, ResultRow, ResultSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default timeout for opening a backend connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default timeout for running a statement and fetching its rows.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Query executor that handles database query execution.
#[derive(Clone)]
pub struct QueryExecutor {
    backend: Arc<dyn Backend>,
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl QueryExecutor {
    /// Create a new query executor with default timeouts.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_timeouts(
            backend,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        )
    }

    pub fn with_timeouts(
        backend: Arc<dyn Backend>,
        connect_timeout: Duration,
        query_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            connect_timeout,
            query_timeout,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Execute one statement against the described database.
    pub async fn execute(
        &self,
        sql: &str,
        descriptor: &ConnectionDescriptor,
    ) -> BotResult<ResultSet> {
        let start = Instant::now();
        debug!(
            sql = %sql,
            dsn = %descriptor.dsn(),
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        let mut session = match timeout(self.connect_timeout, self.backend.connect(descriptor)).await
        {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                warn!(
                    dsn = %descriptor.dsn(),
                    error = %e,
                    retryable = e.is_retryable(),
                    suggestion = e.suggestion().unwrap_or_default(),
                    "Connection failed"
                );
                return Err(e.into_execution());
            }
            Err(_) => {
                warn!(dsn = %descriptor.dsn(), "Connection timed out");
                return Err(timeout_error("connect", self.connect_timeout).into_execution());
            }
        };

        let outcome = match timeout(self.query_timeout, session.run(sql)).await {
            Ok(Ok(StatementOutcome::NoResultSet { rows_affected })) => {
                warn!(rows_affected, "Statement produced no result set; committing");
                session.commit().await.map(|()| ResultSet::empty())
            }
            Ok(Ok(StatementOutcome::Rows { columns, rows })) => {
                let rows = rows
                    .into_iter()
                    .map(|values| ResultRow::from_parts(&columns, values))
                    .collect();
                Ok(ResultSet::new(columns, rows))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(timeout_error("query execution", self.query_timeout)),
        };

        session.close().await;

        match outcome {
            Ok(result) => {
                info!(
                    rows = result.len(),
                    execution_time_ms = start.elapsed().as_millis() as u64,
                    "Query executed"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    suggestion = e.suggestion().unwrap_or_default(),
                    "Query failed"
                );
                Err(e.into_execution())
            }
        }
    }
}

fn timeout_error(operation: &str, limit: Duration) -> BotError {
    BotError::timeout(operation, limit.as_secs() as u32)
}
