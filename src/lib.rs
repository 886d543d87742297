//! db-chat-router library
//!
//! Routes natural-language chat messages to read-only SQL against a catalog
//! of databases (PostgreSQL, MySQL, SQLite) and answers with a formatted
//! summary.

pub mod auth;
pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod models;
pub mod transport;

pub use bot::{ChatResponse, Coordinator};
pub use config::Config;
pub use error::{BotError, BotResult};
