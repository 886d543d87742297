//! Data models for the chat router.
//!
//! This module re-exports all model types used throughout the application.

pub mod catalog;
pub mod plan;
pub mod result;

// Re-export commonly used types
pub use catalog::{AccessRole, BackendKind, ConnectionDescriptor, DatabaseEntry};
pub use plan::{
    ConfidenceLabel, FALLBACK_CONFIDENCE, GENERATED_CONFIDENCE, PREDEFINED_CONFIDENCE, QueryOrigin,
    QueryPlan, TEMPLATE_CONFIDENCE,
};
pub use result::{ResultRow, ResultSet};
