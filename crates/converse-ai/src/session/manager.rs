//! Session struct and construction.

use std::sync::Arc;

use converse_config::{validation, ChatOptions, ChatOptionsOverrides, ConverseConfig};
use tokio::sync::Mutex;

use crate::conversation::{Conversation, ConversationStore};
use crate::keys::KeyStore;
use crate::prompt::PromptBuilder;
use crate::tokenizer::Tokenizer;
use crate::transport::Transport;
use crate::usage::UsageTracker;
use crate::{AiError, ConversationId};

/// Conversational session over a remote completion endpoint.
///
/// One `Session` serves any number of conversations, keyed by
/// [`ConversationId`]. It is `Send + Sync` and meant to be shared behind an
/// `Arc`.
pub struct Session {
    pub(super) store: ConversationStore,
    pub(super) builder: PromptBuilder,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) keys: Arc<dyn KeyStore>,
    pub(super) options: ChatOptions,
    pub(super) tracker: Mutex<UsageTracker>,
}

impl Session {
    pub fn new(
        transport: Arc<dyn Transport>,
        keys: Arc<dyn KeyStore>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        Self {
            store: ConversationStore::new(),
            builder: PromptBuilder::new(tokenizer),
            transport,
            keys,
            options: ChatOptions::default(),
            tracker: Mutex::new(UsageTracker::new()),
        }
    }

    /// Build a session from a loaded config. The config is validated first.
    pub fn from_config(
        config: &ConverseConfig,
        transport: Arc<dyn Transport>,
        keys: Arc<dyn KeyStore>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, AiError> {
        validation::validate(config)?;
        Ok(Self::new(transport, keys, tokenizer).with_options(config.effective_options()))
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Apply overrides on top of the current options, field by field.
    pub fn with_overrides(mut self, overrides: &ChatOptionsOverrides) -> Self {
        self.options = self.options.apply(overrides);
        self
    }

    /// Share an existing store, e.g. between sessions with different options.
    pub fn with_store(mut self, store: ConversationStore) -> Self {
        self.store = store;
        self
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Clear a conversation's history. Returns `None` for unknown ids.
    pub async fn reset(&self, id: &ConversationId) -> Option<Conversation> {
        self.store.reset(id).await
    }

    /// Copy of a conversation's current state.
    pub async fn conversation(&self, id: &ConversationId) -> Option<Conversation> {
        self.store.snapshot(id).await
    }

    /// Cumulative usage of every completed exchange so far.
    pub async fn usage(&self) -> UsageTracker {
        self.tracker.lock().await.clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("options", &self.options)
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}
