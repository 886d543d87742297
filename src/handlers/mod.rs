//! Message handlers.
//!
//! Each stage of the request pipeline lives here: greeting and help, target
//! resolution, predefined-query matching, query synthesis, read-only
//! validation, result summarization and response formatting.

pub mod format;
pub mod greeting;
pub mod matcher;
pub mod resolver;
pub mod sql_validator;
pub mod summarizer;
pub mod synthesizer;
pub mod text;

pub use greeting::Greeter;
pub use matcher::{PatternMatcher, PredefinedQuery};
pub use resolver::{Resolution, TargetResolver};
pub use summarizer::ResultSummarizer;
pub use synthesizer::QuerySynthesizer;
