//! Database layer.
//!
//! This module provides database access functionality:
//! - The static catalog of target databases
//! - Backend connections behind a mockable trait
//! - Query execution with timeouts and guaranteed connection release
//! - Cell rendering to text
//! - Ready-made monitoring queries per dialect

pub mod backend;
pub mod executor;
pub mod queries;
pub mod registry;
pub mod types;

pub use backend::{Backend, BackendSession, SqlxBackend, StatementOutcome};
pub use executor::QueryExecutor;
pub use queries::CannedQuery;
pub use registry::DatabaseRegistry;
