//! Chat options: the concrete option set and its partial-override form.

use serde::{Deserialize, Serialize};

/// Instruction preamble used when none is configured.
pub const DEFAULT_INSTRUCTIONS: &str = "You are ChatGPT, a language model developed by OpenAI. \
You are designed to respond to user input in a conversational manner. Answer as concisely as possible. \
Your training data comes from a diverse range of internet text and you have been trained to generate \
human-like responses to various questions and prompts. You can provide information on a wide range of \
topics, but your knowledge is limited to what was present in your training data. You strive to provide \
accurate and helpful information to the best of your ability.\nKnowledge cutoff: 2021-09";

/// Payload shape expected by the remote endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// A flat prompt string (`/v1/completions`), deltas in `choices[0].text`.
    Completion,
    /// A role-tagged message list (`/v1/chat/completions`), deltas in
    /// `choices[0].delta.content`.
    #[default]
    Chat,
}

/// Fully resolved options for one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub model: String,
    pub style: PromptStyle,
    pub temperature: f64,
    /// Reply ceiling, reserved out of `max_conversation_tokens`.
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub instructions: String,
    /// Completion-style stop sequence. Also scrubbed from replies.
    pub stop: String,
    /// Label for assistant lines in completion-style prompts.
    pub ai_name: String,
    pub moderation: bool,
    pub endpoint: String,
    /// Price per 1000 tokens.
    pub price: f64,
    /// Hard ceiling for prompt + reply.
    pub max_conversation_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            style: PromptStyle::Chat,
            temperature: 0.7,
            max_tokens: 512,
            top_p: 0.9,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            instructions: DEFAULT_INSTRUCTIONS.into(),
            stop: "<|im_end|>".into(),
            ai_name: "ChatGPT".into(),
            moderation: false,
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            price: 0.002,
            max_conversation_tokens: 4097,
        }
    }
}

/// Caller-supplied overrides. `None` keeps the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatOptionsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<PromptStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_conversation_tokens: Option<u32>,
}

impl ChatOptions {
    /// Merge `overrides` over `self`, field by field.
    pub fn apply(&self, overrides: &ChatOptionsOverrides) -> ChatOptions {
        let o = overrides.clone();
        ChatOptions {
            model: o.model.unwrap_or_else(|| self.model.clone()),
            style: o.style.unwrap_or(self.style),
            temperature: o.temperature.unwrap_or(self.temperature),
            max_tokens: o.max_tokens.unwrap_or(self.max_tokens),
            top_p: o.top_p.unwrap_or(self.top_p),
            frequency_penalty: o.frequency_penalty.unwrap_or(self.frequency_penalty),
            presence_penalty: o.presence_penalty.unwrap_or(self.presence_penalty),
            instructions: o.instructions.unwrap_or_else(|| self.instructions.clone()),
            stop: o.stop.unwrap_or_else(|| self.stop.clone()),
            ai_name: o.ai_name.unwrap_or_else(|| self.ai_name.clone()),
            moderation: o.moderation.unwrap_or(self.moderation),
            endpoint: o.endpoint.unwrap_or_else(|| self.endpoint.clone()),
            price: o.price.unwrap_or(self.price),
            max_conversation_tokens: o
                .max_conversation_tokens
                .unwrap_or(self.max_conversation_tokens),
        }
    }

    /// Tokens left for the prompt once the reply ceiling is reserved.
    pub fn prompt_budget(&self) -> u32 {
        self.max_conversation_tokens.saturating_sub(self.max_tokens)
    }
}

/// Resolve overrides against the built-in defaults.
pub fn apply_defaults(overrides: &ChatOptionsOverrides) -> ChatOptions {
    ChatOptions::default().apply(overrides)
}
