//! Prompt building with whole-message FIFO eviction.

use std::sync::Arc;

use chrono::{DateTime, Local};
use converse_config::ChatOptions;
use tracing::debug;

use super::render::{render_payload, render_text, PromptPayload};
use crate::conversation::Conversation;
use crate::tokenizer::Tokenizer;
use crate::{AiError, Message};

const SENTENCE_ENDINGS: [char; 4] = [',', '!', '?', '.'];

/// A prompt ready for the transport.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub payload: PromptPayload,
    /// Tokens in the rendered prompt, excluding the reply reservation.
    pub prompt_tokens: usize,
    /// Messages evicted from the front of history to fit the budget.
    pub evicted: usize,
}

/// End the text with punctuation so the model continues a finished turn.
pub fn normalize_user_text(text: &str) -> String {
    let text = text.trim_end();
    if text.ends_with(SENTENCE_ENDINGS) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

/// Renders conversations into token-bounded prompts.
#[derive(Clone)]
pub struct PromptBuilder {
    tokenizer: Arc<dyn Tokenizer>,
}

impl PromptBuilder {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Append the user's text and render the prompt, evicting the oldest
    /// messages until prompt + `max_tokens` fits `max_conversation_tokens`.
    pub fn build(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        options: &ChatOptions,
    ) -> Result<RenderedPrompt, AiError> {
        self.build_at(conversation, user_text, options, Local::now())
    }

    /// [`build`](Self::build) with a fixed clock for the preamble.
    ///
    /// If even the new message alone does not fit, it is taken back out of
    /// history and [`AiError::ConversationTooLarge`] is returned. Messages
    /// evicted on the way stay evicted.
    pub fn build_at(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        options: &ChatOptions,
        now: DateTime<Local>,
    ) -> Result<RenderedPrompt, AiError> {
        conversation.push(Message::user(normalize_user_text(user_text)));

        let budget = options.max_conversation_tokens as usize;
        let reserved = options.max_tokens as usize;
        let mut prompt_tokens = self.count_tokens(conversation, options, now);
        let mut evicted = 0;

        while prompt_tokens + reserved > budget {
            if conversation.len() <= 1 {
                conversation.pop_latest();
                return Err(AiError::ConversationTooLarge {
                    tokens: prompt_tokens + reserved,
                    budget,
                });
            }
            conversation.evict_oldest();
            evicted += 1;
            prompt_tokens = self.count_tokens(conversation, options, now);
        }

        conversation.touch();
        if evicted > 0 {
            debug!(
                conversation = %conversation.id,
                evicted,
                retained = conversation.len(),
                prompt_tokens,
                "trimmed conversation to fit token budget"
            );
        }

        Ok(RenderedPrompt {
            payload: render_payload(conversation, options, now),
            prompt_tokens,
            evicted,
        })
    }

    /// Tokens in the conversation's rendered text.
    pub fn count_tokens(
        &self,
        conversation: &Conversation,
        options: &ChatOptions,
        now: DateTime<Local>,
    ) -> usize {
        self.tokenizer.count(&render_text(conversation, options, now))
    }
}

impl std::fmt::Debug for PromptBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptBuilder").finish_non_exhaustive()
    }
}
