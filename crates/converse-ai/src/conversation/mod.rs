//! Conversation state and the in-memory store that owns it.

mod store;
mod types;

pub use store::{ConversationStore, SharedConversation};
pub use types::{Conversation, DEFAULT_USER_NAME};
