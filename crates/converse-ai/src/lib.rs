//! Conversation engine for Converse.
//!
//! Sits between a caller and a remote completion/chat endpoint:
//! - Per-conversation message history ([`ConversationStore`])
//! - Token-bounded prompt rendering with a sliding window ([`PromptBuilder`])
//! - Incremental SSE decoding of streamed replies ([`streaming`])
//! - Key selection and usage accounting ([`keys`], [`usage`])
//! - The [`Session`] facade tying one ask/ask-stream call together

pub mod conversation;
pub mod keys;
pub mod prompt;
pub mod session;
pub mod streaming;
pub mod tokenizer;
pub mod transport;
pub mod usage;

use chrono::{DateTime, Utc};
use converse_common::ConfigError;

pub use conversation::{Conversation, ConversationStore, SharedConversation, DEFAULT_USER_NAME};
pub use converse_common::ConversationId;
pub use converse_config::{ChatOptions, ChatOptionsOverrides, PromptStyle};
pub use keys::{select_key, ApiKey, InMemoryKeyStore, KeyStore};
pub use prompt::{ChatMessage, PromptBuilder, PromptPayload, RenderedPrompt};
pub use session::Session;
pub use tokenizer::{BpeTokenizer, Tokenizer};
pub use transport::{ByteStream, CompletionRequest, OpenAiClient, OpenAiConfig, Transport};
pub use usage::{Usage, UsageTracker};

/// One stored turn of a conversation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: converse_common::new_id(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Author of a stored message. The system preamble is rendered on every
/// call and never stored, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("no API keys available")]
    NoKeysAvailable,

    #[error("remote request failed: {message}")]
    RemoteRequestFailed {
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("malformed stream payload: {reason}")]
    MalformedStreamPayload { payload: String, reason: String },

    #[error("conversation too large: {tokens} tokens exceeds budget of {budget}")]
    ConversationTooLarge { tokens: usize, budget: usize },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AiError {
    pub(crate) fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        AiError::RemoteRequestFailed {
            status,
            message: message.into(),
            source: None,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::RemoteRequestFailed {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
