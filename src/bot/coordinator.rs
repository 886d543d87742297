//! Request coordinator.
//!
//! Composition root of the pipeline. One call to [`Coordinator::handle`]
//! processes one inbound message end to end:
//!
//! 1. empty text, greeting and help short-circuits
//! 2. target resolution, continuing a pending dialog when one exists
//! 3. predefined-query match, otherwise synthesis
//! 4. execution, summarization and response composition
//!
//! The coordinator is the only owner of conversation state. Any failure it
//! does not handle explicitly, panics included, clears the conversation's
//! pending state before a generic reply is returned.

use crate::bot::conversation::ConversationStore;
use crate::db::{Backend, DatabaseRegistry, QueryExecutor};
use crate::error::{BotError, BotResult};
use crate::handlers::format::{compose_response, execution_error_response};
use crate::handlers::greeting::{Greeter, is_greeting, is_help_request};
use crate::handlers::{
    PatternMatcher, QuerySynthesizer, Resolution, ResultSummarizer, TargetResolver,
};
use crate::llm::{IntentAnalyzer, TextGenerator};
use crate::models::{DatabaseEntry, QueryOrigin};
use futures_util::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

const EMPTY_TEXT_REPLY: &str = "Please write a query.";
const GENERIC_ERROR_REPLY: &str =
    "❌ An internal error occurred while processing your query. Please try again.";

/// Execution facts attached to a successful reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseDetails {
    pub query: String,
    pub row_count: usize,
    pub database: String,
    pub origin: QueryOrigin,
    pub confidence: f64,
}

/// Reply to one inbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub text: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ResponseDetails>,
}

impl ChatResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
            details: None,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
            details: None,
        }
    }

    fn with_details(mut self, details: ResponseDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// Sequences every stage of the request/response cycle.
#[derive(Clone)]
pub struct Coordinator {
    resolver: TargetResolver,
    matcher: PatternMatcher,
    synthesizer: QuerySynthesizer,
    executor: QueryExecutor,
    summarizer: ResultSummarizer,
    greeter: Greeter,
    conversations: Arc<ConversationStore>,
}

impl Coordinator {
    /// Coordinator with default timeouts, UTC greetings and a default store.
    pub fn new(
        registry: Arc<DatabaseRegistry>,
        generator: Arc<dyn TextGenerator>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            resolver: TargetResolver::new(registry),
            matcher: PatternMatcher::new(),
            synthesizer: QuerySynthesizer::new(generator.clone()),
            executor: QueryExecutor::new(backend),
            summarizer: ResultSummarizer::new(generator),
            greeter: Greeter::new(0),
            conversations: Arc::new(ConversationStore::default()),
        }
    }

    pub fn with_executor(mut self, executor: QueryExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_greeter(mut self, greeter: Greeter) -> Self {
        self.greeter = greeter;
        self
    }

    pub fn with_conversation_store(mut self, store: Arc<ConversationStore>) -> Self {
        self.conversations = store;
        self
    }

    pub fn with_intent_analysis(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.synthesizer = self
            .synthesizer
            .with_intent_analysis(IntentAnalyzer::new(generator));
        self
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub fn registry(&self) -> &DatabaseRegistry {
        self.resolver.registry()
    }

    /// Process one message from a conversation. Never fails.
    pub async fn handle(&self, conversation_id: &str, text: &str) -> ChatResponse {
        let span = info_span!("message", request_id = %Uuid::new_v4(), conversation_id);
        let outcome = AssertUnwindSafe(self.process(conversation_id, text))
            .catch_unwind()
            .instrument(span)
            .await;

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(conversation_id, error = %e, "Unhandled error; clearing conversation state");
                self.conversations.clear(conversation_id).await;
                ChatResponse::failure(GENERIC_ERROR_REPLY)
            }
            Err(_) => {
                error!(conversation_id, "Pipeline panicked; clearing conversation state");
                self.conversations.clear(conversation_id).await;
                ChatResponse::failure(GENERIC_ERROR_REPLY)
            }
        }
    }

    async fn process(&self, conversation_id: &str, text: &str) -> BotResult<ChatResponse> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(ChatResponse::failure(EMPTY_TEXT_REPLY));
        }
        if is_greeting(text) {
            return Ok(ChatResponse::ok(self.greeter.greeting(self.registry())));
        }
        if is_help_request(text) {
            return Ok(ChatResponse::ok(self.greeter.help(self.registry())));
        }

        let (attempt, full_text) = match self.conversations.get(conversation_id).await {
            Some(state) => {
                (state.attempt, format!("{} {}", state.original_text, text))
            }
            None => (1, text.to_string()),
        };
        info!(attempt, text = %full_text, "Processing message");

        match self.resolver.resolve(&full_text, conversation_id, attempt) {
            Resolution::Resolved {
                entry,
                remaining_text,
                ..
            } => {
                self.conversations.clear(conversation_id).await;
                self.run_query(&entry, &remaining_text).await
            }
            Resolution::NeedsMoreInput {
                next_attempt,
                prompt,
            } => {
                self.conversations
                    .await_target(conversation_id, &full_text, next_attempt)
                    .await;
                Ok(ChatResponse::failure(prompt))
            }
            Resolution::Failed { message, .. } => {
                self.conversations.clear(conversation_id).await;
                Ok(ChatResponse::failure(message))
            }
        }
    }

    async fn run_query(&self, target: &DatabaseEntry, text: &str) -> BotResult<ChatResponse> {
        let kind = target.connection.kind;
        let plan = match self.matcher.find_match(text) {
            Some(predefined) => predefined.plan(kind),
            None => self.synthesizer.synthesize(text, target).await,
        };
        info!(
            target = %target.id,
            origin = %plan.origin,
            confidence = plan.confidence,
            "Query planned"
        );

        let result = match self.executor.execute(&plan.sql, &target.connection).await {
            Ok(result) => result,
            Err(BotError::Execution { message }) => {
                warn!(target = %target.id, error = %message, "Execution failed");
                return Ok(ChatResponse::failure(execution_error_response(
                    &message, &plan.sql,
                )));
            }
            Err(e) => return Err(e),
        };

        let analysis = self.summarizer.summarize(&result, &plan.sql, text).await;
        let details = ResponseDetails {
            query: plan.sql.clone(),
            row_count: result.len(),
            database: target.id.clone(),
            origin: plan.origin,
            confidence: plan.confidence,
        };
        Ok(ChatResponse::ok(compose_response(target, &plan, &result, &analysis))
            .with_details(details))
    }
}
