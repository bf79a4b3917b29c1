//! The conversation record.

use chrono::{DateTime, Utc};
use converse_common::ConversationId;
use serde::{Deserialize, Serialize};

use crate::Message;

/// Participant name that is left out of the rendered preamble.
pub const DEFAULT_USER_NAME: &str = "User";

/// A named, ordered message history.
///
/// Messages are append-only. The sliding window may evict whole messages
/// from the front; retained messages are never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    /// Display name of the human participant.
    pub user_name: String,
    messages: Vec<Message>,
    pub last_active: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId, user_name: impl Into<String>) -> Self {
        Self {
            id,
            user_name: user_name.into(),
            messages: Vec::new(),
            last_active: Utc::now(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message and mark the conversation active.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Remove the oldest retained message.
    pub(crate) fn evict_oldest(&mut self) -> Option<Message> {
        if self.messages.is_empty() {
            None
        } else {
            Some(self.messages.remove(0))
        }
    }

    /// Take back the most recent message (an append that could not be sent).
    pub(crate) fn pop_latest(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    /// Drop all history, keeping identity and participant name.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}
