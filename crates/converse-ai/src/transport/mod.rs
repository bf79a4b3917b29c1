//! Remote endpoint collaborator.
//!
//! The session never speaks HTTP itself. It hands a [`CompletionRequest`]
//! to a [`Transport`] and gets back either the whole reply text or the raw
//! byte stream of a streamed reply, which it feeds to
//! [`decode_stream`](crate::streaming::decode_stream).

mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use converse_config::{ChatOptions, PromptStyle};
use futures_util::Stream;
use serde_json::json;

use crate::prompt::PromptPayload;
use crate::AiError;

pub use openai::{OpenAiClient, OpenAiConfig};

/// Raw body chunks of a streamed reply.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, AiError>> + Send>>;

/// A fully rendered request: where to send it and the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub endpoint: String,
    pub style: PromptStyle,
    pub body: serde_json::Value,
}

impl CompletionRequest {
    /// Build the request body for `payload` with the sampling options.
    ///
    /// Completion-style bodies carry `prompt` and the `stop` sequence,
    /// chat-style bodies carry `messages`.
    pub fn build(payload: &PromptPayload, options: &ChatOptions, stream: bool) -> Self {
        let mut body = json!({
            "model": options.model,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "top_p": options.top_p,
            "frequency_penalty": options.frequency_penalty,
            "presence_penalty": options.presence_penalty,
            "stream": stream,
        });

        match payload {
            PromptPayload::Completion(prompt) => {
                body["prompt"] = json!(prompt);
                if !options.stop.is_empty() {
                    body["stop"] = json!([options.stop]);
                }
            }
            PromptPayload::Chat(messages) => {
                body["messages"] = json!(messages);
            }
        }

        Self {
            endpoint: options.endpoint.clone(),
            style: payload.style(),
            body,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.body["stream"].as_bool().unwrap_or(false)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a non-streaming request and return the reply text.
    async fn complete(&self, api_key: &str, request: &CompletionRequest)
        -> Result<String, AiError>;

    /// Send a streaming request and return the raw body stream.
    async fn complete_streaming(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<ByteStream, AiError>;

    /// Ask the moderation endpoint whether `input` is flagged.
    async fn moderate(&self, api_key: &str, input: &str) -> Result<bool, AiError>;
}
