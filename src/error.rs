//! Error types for the chat router.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Resolution outcomes (target missing, target not found) are not errors: they are
//! modelled as variants of [`crate::handlers::resolver::Resolution`]. Everything that
//! can actually fail (backend calls, text-generation calls, transport I/O) lands here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    /// Any backend failure surfaced to the user, carrying the backend's message.
    #[error("Execution failed: {message}")]
    Execution { message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    /// The text-generation service failed or returned something unusable.
    #[error("Text generation failed: {message}")]
    Generation { message: String },

    #[error("Unsafe query rejected: {reason}")]
    UnsafeQuery { reason: String },

    #[error("Catalog error: {message}")]
    Catalog { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create an execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a text-generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Create an unsafe query error.
    pub fn unsafe_query(reason: impl Into<String>) -> Self {
        Self::UnsafeQuery {
            reason: reason.into(),
        }
    }

    /// Create a catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Collapse any backend-side failure into a single [`BotError::Execution`].
    ///
    /// The executor reports every failure through this variant so the
    /// coordinator has exactly one case to surface to the user.
    pub fn into_execution(self) -> Self {
        match self {
            Self::Execution { .. } => self,
            Self::Database {
                message, sql_state, ..
            } => match sql_state {
                Some(code) => Self::execution(format!("{} (SQLSTATE: {})", message, code)),
                None => Self::execution(message),
            },
            Self::Connection { message, .. } => Self::execution(message),
            other => Self::execution(other.to_string()),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Nothing in the pipeline retries automatically; this only feeds log fields.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert sqlx errors to BotError.
impl From<sqlx::Error> for BotError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => BotError::connection(
                msg.to_string(),
                "Check the connection descriptor in the catalog",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                BotError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => BotError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => BotError::timeout("connection acquire", 30),
            sqlx::Error::PoolClosed => {
                BotError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => BotError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => BotError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => BotError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                BotError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => BotError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => BotError::internal("Database worker crashed"),
            _ => BotError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BotError::timeout("text generation request", 0)
        } else {
            BotError::generation(err.to_string())
        }
    }
}

/// Result type alias for fallible operations.
pub type BotResult<T> = Result<T, BotError>;
