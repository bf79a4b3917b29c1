//! Conversation store: maps conversation ids to their state.
//!
//! Each conversation sits behind its own mutex so calls on different ids
//! never contend beyond the brief map lookup. A session holds that mutex
//! for a whole exchange, so asks on the *same* id run one at a time.

use std::collections::HashMap;
use std::sync::Arc;

use converse_common::ConversationId;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::types::Conversation;

/// Handle to one conversation in the store.
pub type SharedConversation = Arc<Mutex<Conversation>>;

/// Thread-safe conversation store.
#[derive(Clone, Default)]
pub struct ConversationStore {
    conversations: Arc<RwLock<HashMap<ConversationId, SharedConversation>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a conversation, creating an empty one if the id is unseen.
    ///
    /// An existing conversation takes `user_name` (last writer wins) and
    /// is marked active.
    pub async fn get_or_create(&self, id: &ConversationId, user_name: &str) -> SharedConversation {
        let existing = self.conversations.read().await.get(id).cloned();
        let handle = match existing {
            Some(handle) => handle,
            None => {
                let mut map = self.conversations.write().await;
                map.entry(id.clone())
                    .or_insert_with(|| {
                        debug!(conversation = %id, "creating conversation");
                        Arc::new(Mutex::new(Conversation::new(id.clone(), user_name)))
                    })
                    .clone()
            }
        };

        {
            let mut conv = handle.lock().await;
            conv.user_name = user_name.to_string();
            conv.touch();
        }
        handle
    }

    /// Clear a conversation's history. Returns the cleared conversation,
    /// or `None` if the id is unknown.
    pub async fn reset(&self, id: &ConversationId) -> Option<Conversation> {
        let handle = self.conversations.read().await.get(id).cloned()?;
        let mut conv = handle.lock().await;
        conv.clear();
        debug!(conversation = %id, "conversation reset");
        Some(conv.clone())
    }

    /// Copy of a conversation's current state, for inspection.
    pub async fn snapshot(&self, id: &ConversationId) -> Option<Conversation> {
        let handle = self.conversations.read().await.get(id).cloned()?;
        let conv = handle.lock().await;
        Some(conv.clone())
    }

    /// Keep only conversations for which `keep` returns true.
    ///
    /// The store has no eviction policy of its own; callers use this to
    /// apply one (idle timeouts, size caps). Conversations locked by an
    /// exchange in flight are kept. Returns how many were removed.
    pub async fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&Conversation) -> bool,
    {
        let mut map = self.conversations.write().await;
        let mut doomed = Vec::new();
        for (id, handle) in map.iter() {
            let Ok(conv) = handle.try_lock() else {
                continue;
            };
            if !keep(&conv) {
                doomed.push(id.clone());
            }
        }
        for id in &doomed {
            debug!(conversation = %id, "removing conversation");
            map.remove(id);
        }
        doomed.len()
    }

    pub async fn contains(&self, id: &ConversationId) -> bool {
        self.conversations.read().await.contains_key(id)
    }

    /// Number of conversations held.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}
