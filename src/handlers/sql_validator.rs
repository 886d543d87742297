//! Read-only enforcement for query text.
//!
//! Two layers, both must pass:
//! 1. Lexical: the text starts with `SELECT`, contains none of the mutating
//!    keywords anywhere as a case-insensitive substring, and has no `INTO`
//!    word (`SELECT ... INTO` creates tables or writes files).
//! 2. Structural: when [sqlparser](https://docs.rs/sqlparser/) can parse the
//!    text, it must be exactly one query statement whose body only reads.
//!
//! The lexical layer is blunt: `created_at` trips on `create`.
//! Text the parser cannot handle (vendor syntax) is judged by the lexical
//! layer alone.

use crate::error::{BotError, BotResult};
use crate::models::BackendKind;
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use tracing::debug;

/// Keywords that must not appear anywhere in an accepted query.
pub const MUTATING_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "truncate", "grant", "revoke",
];

const READ_KEYWORD: &str = "select";

const INTO_KEYWORD: &str = "into";

/// Type of SQL statement detected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlStatementType {
    /// SELECT, VALUES, set operations
    Query,
    /// INSERT, UPDATE, DELETE, MERGE, COPY
    DmlWrite,
    /// CREATE, DROP, ALTER, TRUNCATE
    Ddl,
    /// BEGIN, COMMIT, ROLLBACK, SAVEPOINT
    Transaction,
    /// GRANT, REVOKE, SET and the rest
    Other,
}

fn get_dialect(kind: Option<BackendKind>) -> Box<dyn Dialect> {
    match kind {
        Some(BackendKind::Postgres) => Box::new(PostgreSqlDialect {}),
        Some(BackendKind::MySql) => Box::new(MySqlDialect {}),
        Some(BackendKind::SQLite) => Box::new(SQLiteDialect {}),
        None => Box::new(GenericDialect {}),
    }
}

/// Validate query text with the generic SQL dialect.
///
/// ```
/// use db_chat_router::handlers::sql_validator::validate_readonly;
///
/// assert!(validate_readonly("SELECT username FROM sessions").is_ok());
/// assert!(validate_readonly("DELETE FROM sessions").is_err());
/// ```
pub fn validate_readonly(sql: &str) -> BotResult<()> {
    validate(sql, None)
}

/// Validate query text, parsing it in the dialect of `kind`.
pub fn validate_readonly_for(sql: &str, kind: BackendKind) -> BotResult<()> {
    validate(sql, Some(kind))
}

fn validate(sql: &str, kind: Option<BackendKind>) -> BotResult<()> {
    let lowered = sql.trim().to_lowercase();
    if lowered.is_empty() {
        return Err(BotError::unsafe_query("empty query"));
    }

    if !lowered.starts_with(READ_KEYWORD) {
        return Err(BotError::unsafe_query("query does not start with SELECT"));
    }

    if let Some(keyword) = MUTATING_KEYWORDS.iter().find(|k| lowered.contains(*k)) {
        return Err(BotError::unsafe_query(format!(
            "query contains forbidden keyword '{}'",
            keyword
        )));
    }

    if has_into_clause(&lowered) {
        return Err(BotError::unsafe_query("query contains an INTO clause"));
    }

    let dialect = get_dialect(kind);
    match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) => {
            if statements.len() != 1 {
                return Err(BotError::unsafe_query(format!(
                    "expected exactly one statement, found {}",
                    statements.len()
                )));
            }
            match classify_statement(&statements[0]) {
                SqlStatementType::Query => match &statements[0] {
                    Statement::Query(query) if query_writes(query) => {
                        Err(BotError::unsafe_query("query body writes data"))
                    }
                    _ => Ok(()),
                },
                other => Err(BotError::unsafe_query(format!(
                    "statement is not a query ({:?})",
                    other
                ))),
            }
        }
        Err(e) => {
            debug!(error = %e, "Parser rejected query text; lexical checks only");
            Ok(())
        }
    }
}

fn has_into_clause(lowered: &str) -> bool {
    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == INTO_KEYWORD)
}

/// Whether a parsed query stores its rows somewhere or embeds a write.
fn query_writes(query: &Query) -> bool {
    set_expr_writes(&query.body)
}

fn set_expr_writes(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_some(),
        SetExpr::Query(inner) => query_writes(inner),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_writes(left) || set_expr_writes(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => false,
        _ => true,
    }
}

/// Classify a parsed statement into a statement type.
fn classify_statement(stmt: &Statement) -> SqlStatementType {
    match stmt {
        Statement::Query(_) => SqlStatementType::Query,

        Statement::Insert(_)
        | Statement::Update { .. }
        | Statement::Delete(_)
        | Statement::Merge { .. }
        | Statement::Copy { .. } => SqlStatementType::DmlWrite,

        Statement::CreateTable { .. }
        | Statement::CreateView { .. }
        | Statement::CreateIndex(_)
        | Statement::AlterTable { .. }
        | Statement::Drop { .. }
        | Statement::Truncate { .. } => SqlStatementType::Ddl,

        Statement::StartTransaction { .. }
        | Statement::Commit { .. }
        | Statement::Rollback { .. }
        | Statement::Savepoint { .. } => SqlStatementType::Transaction,

        _ => SqlStatementType::Other,
    }
}
