//! Conversation handling: the coordinator and its pending-state store.

pub mod conversation;
pub mod coordinator;

pub use conversation::{ConversationState, ConversationStore};
pub use coordinator::{ChatResponse, Coordinator, ResponseDetails};
