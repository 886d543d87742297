//! Pending conversation state.
//!
//! A conversation has state only while the bot is waiting for the user to
//! name a target database. Entries are removed on resolution, on terminal
//! failure, on any unhandled error, or once they outlive the TTL. Expired
//! entries are invisible to readers even before the cleanup task runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Default lifetime of a pending state.
pub const DEFAULT_CONVERSATION_TTL_SECS: u64 = 600;

/// Interval of the background eviction task.
const CLEANUP_INTERVAL_SECS: u64 = 30;

/// What the bot remembers while it waits for a target database.
#[derive(Debug, Clone)]
pub struct ConversationState {
    /// The user's first message, before any clarification.
    pub original_text: String,
    /// Attempt number the next message is evaluated under.
    pub attempt: u8,
    pub updated_at: Instant,
}

impl ConversationState {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.updated_at.elapsed() > ttl
    }
}

/// TTL-bounded map of conversation id to pending state.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    states: Arc<RwLock<HashMap<String, ConversationState>>>,
    ttl: Duration,
}

impl ConversationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live state for a conversation; expired entries read as absent.
    pub async fn get(&self, conversation_id: &str) -> Option<ConversationState> {
        let states = self.states.read().await;
        states
            .get(conversation_id)
            .filter(|state| !state.is_expired(self.ttl))
            .cloned()
    }

    /// Record that the bot is waiting for a target, replacing any prior state.
    pub async fn await_target(&self, conversation_id: &str, original_text: &str, attempt: u8) {
        let mut states = self.states.write().await;
        states.insert(
            conversation_id.to_string(),
            ConversationState {
                original_text: original_text.to_string(),
                attempt,
                updated_at: Instant::now(),
            },
        );
        debug!(conversation_id, attempt, "Awaiting target database");
    }

    /// Drop the state for a conversation. Returns whether one existed.
    pub async fn clear(&self, conversation_id: &str) -> bool {
        let mut states = self.states.write().await;
        let removed = states.remove(conversation_id).is_some();
        if removed {
            debug!(conversation_id, "Conversation state cleared");
        }
        removed
    }

    /// Number of stored entries, expired ones included until evicted.
    pub async fn count(&self) -> usize {
        self.states.read().await.len()
    }

    /// Remove expired entries. Returns how many were evicted.
    pub async fn cleanup_expired(&self) -> usize {
        let mut states = self.states.write().await;
        let before = states.len();
        states.retain(|_, state| !state.is_expired(self.ttl));
        let evicted = before - states.len();
        if evicted > 0 {
            info!(evicted, "Evicted expired conversation states");
        }
        evicted
    }

    /// Spawn the periodic eviction task. Call once at startup.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        });
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CONVERSATION_TTL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_starts_empty() {
        let store = ConversationStore::default();
        assert_eq!(store.count().await, 0);
        assert!(store.get("chat-1").await.is_none());
        assert_eq!(store.ttl(), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_await_target_replaces_state() {
        let store = ConversationStore::default();
        store.await_target("chat-1", "estado de la base", 2).await;
        store.await_target("chat-1", "sesiones activas", 2).await;

        let state = store.get("chat-1").await.unwrap();
        assert_eq!(state.original_text, "sesiones activas");
        assert_eq!(state.attempt, 2);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = ConversationStore::default();
        store.await_target("chat-1", "x", 2).await;
        assert!(store.clear("chat-1").await);
        assert!(!store.clear("chat-1").await);
        assert!(store.get("chat-1").await.is_none());
    }

    #[tokio::test]
    async fn test_conversations_are_independent() {
        let store = ConversationStore::default();
        store.await_target("chat-1", "a", 2).await;
        store.await_target("chat-2", "b", 2).await;
        store.clear("chat-1").await;
        assert_eq!(store.get("chat-2").await.unwrap().original_text, "b");
    }

    #[tokio::test]
    async fn test_expired_state_is_invisible_then_evicted() {
        let store = ConversationStore::new(Duration::from_millis(20));
        store.await_target("chat-1", "estado", 2).await;
        assert!(store.get("chat-1").await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get("chat-1").await.is_none());
        assert_eq!(store.count().await, 1);

        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.count().await, 0);
    }
}
