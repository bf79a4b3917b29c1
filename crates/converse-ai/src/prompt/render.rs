//! Rendering a conversation into the two endpoint payload shapes.

use chrono::{DateTime, Local};
use converse_config::{ChatOptions, PromptStyle};
use serde::{Deserialize, Serialize};

use crate::conversation::{Conversation, DEFAULT_USER_NAME};
use crate::Role;

/// Role tag in a chat-style payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One entry of a chat-style `messages` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The prompt in the shape the endpoint expects.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPayload {
    /// Flat prompt string for completion endpoints.
    Completion(String),
    /// Role-tagged messages for chat endpoints.
    Chat(Vec<ChatMessage>),
}

impl PromptPayload {
    pub fn style(&self) -> PromptStyle {
        match self {
            PromptPayload::Completion(_) => PromptStyle::Completion,
            PromptPayload::Chat(_) => PromptStyle::Chat,
        }
    }
}

/// Instructions plus the current date and time, and the participant's name
/// unless it is the default.
pub fn system_preamble(options: &ChatOptions, user_name: &str, now: DateTime<Local>) -> String {
    let mut preamble = format!(
        "{}\nCurrent date: {}\nCurrent time: {}",
        options.instructions,
        now.format("%Y-%m-%d"),
        now.format("%H:%M:%S"),
    );
    if user_name != DEFAULT_USER_NAME {
        preamble.push_str(&format!("\nName of the user talking to: {user_name}"));
    }
    preamble
}

fn role_label<'a>(role: Role, conversation: &'a Conversation, options: &'a ChatOptions) -> &'a str {
    match role {
        Role::User => &conversation.user_name,
        Role::Assistant => &options.ai_name,
    }
}

/// Flat text form: preamble, one `label: content` line per message, then
/// the assistant's cue. This is the completion payload and the text the
/// token budget is measured on for both styles.
pub fn render_text(conversation: &Conversation, options: &ChatOptions, now: DateTime<Local>) -> String {
    let mut lines = Vec::with_capacity(conversation.len() + 2);
    lines.push(system_preamble(options, &conversation.user_name, now));
    for message in conversation.messages() {
        lines.push(format!(
            "{}: {}",
            role_label(message.role, conversation, options),
            message.content
        ));
    }
    lines.push(format!("{}:", options.ai_name));
    lines.join("\n")
}

pub(crate) fn render_payload(
    conversation: &Conversation,
    options: &ChatOptions,
    now: DateTime<Local>,
) -> PromptPayload {
    match options.style {
        PromptStyle::Completion => PromptPayload::Completion(render_text(conversation, options, now)),
        PromptStyle::Chat => {
            let mut messages = Vec::with_capacity(conversation.len() + 1);
            messages.push(ChatMessage {
                role: ChatRole::System,
                content: system_preamble(options, &conversation.user_name, now),
            });
            messages.extend(conversation.messages().iter().map(|m| ChatMessage {
                role: match m.role {
                    Role::User => ChatRole::User,
                    Role::Assistant => ChatRole::Assistant,
                },
                content: m.content.clone(),
            }));
            PromptPayload::Chat(messages)
        }
    }
}
