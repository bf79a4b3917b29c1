//! Exchange guard and reply cleanup.

use tokio::sync::OwnedMutexGuard;

use crate::conversation::Conversation;
use crate::prompt::RenderedPrompt;
use crate::Message;

/// Reply returned instead of a completion when moderation flags a prompt.
pub const FLAGGED_REPLY: &str = "Your message was flagged as inappropriate and was not sent.";

const END_MARKER: &str = "<|im_end|>";

/// One in-flight exchange.
///
/// Holds the conversation lock from prompt building until the reply is
/// appended, so calls on the same conversation run one after another. If
/// dropped before [`commit`](Self::commit) (error or cancellation) the user
/// message appended by the prompt builder is taken back out.
pub(crate) struct Exchange {
    pub(crate) key: String,
    pub(crate) prompt: RenderedPrompt,
    conversation: OwnedMutexGuard<Conversation>,
    pending: Option<String>,
}

impl Exchange {
    pub(crate) fn new(
        key: String,
        conversation: OwnedMutexGuard<Conversation>,
        prompt: RenderedPrompt,
    ) -> Self {
        let pending = conversation.messages().last().map(|m| m.id.clone());
        Self {
            key,
            prompt,
            conversation,
            pending,
        }
    }

    pub(crate) fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Append the assistant reply and release the conversation.
    pub(crate) fn commit(mut self, reply: &str) {
        self.pending = None;
        self.conversation.push(Message::assistant(reply));
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let is_pending = self
            .conversation
            .messages()
            .last()
            .is_some_and(|m| m.id == pending);
        if is_pending {
            self.conversation.pop_latest();
            tracing::debug!(
                conversation = %self.conversation.id,
                "exchange abandoned, user message rolled back"
            );
        }
    }
}

/// Clean up a raw model reply before it is stored.
///
/// Removes the stop sequence and end marker, then any trailing role labels
/// the model produced for the next user turn (`{user_name}:`, `User:`,
/// `user:`), and trims surrounding whitespace.
pub fn scrub_reply(raw: &str, stop: &str, user_name: &str) -> String {
    let mut reply = raw.replace(END_MARKER, "");
    if !stop.is_empty() {
        reply = reply.replace(stop, "");
    }

    let mut labels = vec!["User:".to_string(), "user:".to_string()];
    if !user_name.trim().is_empty() {
        labels.insert(0, format!("{}:", user_name.trim()));
    }

    let mut reply = reply.trim();
    while let Some(stripped) = labels.iter().find_map(|label| strip_label(reply, label)) {
        reply = stripped.trim_end();
    }
    reply.to_string()
}

/// `text` without a trailing `label`, if the label stands on its own
/// (starts the text or follows whitespace).
fn strip_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let head = text.strip_suffix(label)?;
    match head.chars().next_back() {
        Some(c) if !c.is_whitespace() => None,
        _ => Some(head),
    }
}
