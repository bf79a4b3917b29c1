//! Async ask methods for Session (plain + streaming).

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::keys::select_key;
use crate::streaming::{decode_stream, extract_delta};
use crate::transport::CompletionRequest;
use crate::usage::Usage;
use crate::{AiError, ConversationId};

use super::manager::Session;
use super::types::{scrub_reply, Exchange, FLAGGED_REPLY};

impl Session {
    /// Send `prompt` in conversation `id` and return the cleaned reply.
    pub async fn ask(
        &self,
        prompt: &str,
        id: &ConversationId,
        user_name: &str,
    ) -> Result<String, AiError> {
        let Some(exchange) = self.begin(prompt, id, user_name).await? else {
            return Ok(FLAGGED_REPLY.to_string());
        };

        let request = CompletionRequest::build(&exchange.prompt.payload, &self.options, false);
        let raw = self.transport.complete(&exchange.key, &request).await?;

        let (reply, _) = self.finish(exchange, &raw).await;
        Ok(reply)
    }

    /// Like [`ask`](Self::ask), but streams the reply.
    ///
    /// `on_fragment` receives every text delta as it arrives, `on_usage`
    /// the usage record once the reply is complete. Malformed payloads are
    /// logged and skipped. A transport error mid-stream fails the call and
    /// leaves the history as it was before.
    pub async fn ask_stream<F, U>(
        &self,
        mut on_fragment: F,
        on_usage: U,
        prompt: &str,
        id: &ConversationId,
        user_name: &str,
    ) -> Result<String, AiError>
    where
        F: FnMut(&str) + Send,
        U: FnOnce(&Usage) + Send,
    {
        let Some(exchange) = self.begin(prompt, id, user_name).await? else {
            on_fragment(FLAGGED_REPLY);
            return Ok(FLAGGED_REPLY.to_string());
        };

        let request = CompletionRequest::build(&exchange.prompt.payload, &self.options, true);
        let bytes = self
            .transport
            .complete_streaming(&exchange.key, &request)
            .await?;

        let mut payloads = std::pin::pin!(decode_stream(bytes));
        let mut raw = String::new();
        while let Some(payload) = payloads.next().await {
            match extract_delta(&payload?, self.options.style) {
                Ok(Some(delta)) => {
                    on_fragment(&delta);
                    raw.push_str(&delta);
                }
                Ok(None) => {}
                Err(e) => warn!(conversation = %id, error = %e, "skipping malformed stream payload"),
            }
        }

        let (reply, usage) = self.finish(exchange, &raw).await;
        on_usage(&usage);
        Ok(reply)
    }

    /// Select a key, resolve the conversation, run moderation and build the
    /// prompt. `None` means moderation flagged the prompt.
    async fn begin(
        &self,
        prompt: &str,
        id: &ConversationId,
        user_name: &str,
    ) -> Result<Option<Exchange>, AiError> {
        let keys = self.keys.keys().await;
        let key = select_key(&keys)?.key.clone();

        let shared = self.store.get_or_create(id, user_name).await;

        if self.options.moderation && self.transport.moderate(&key, prompt).await? {
            warn!(conversation = %id, "prompt flagged by moderation, not sent");
            return Ok(None);
        }

        let mut conversation = shared.lock_owned().await;
        let rendered = self.builder.build(&mut conversation, prompt, &self.options)?;
        debug!(
            conversation = %id,
            prompt_tokens = rendered.prompt_tokens,
            messages = conversation.len(),
            "prompt built"
        );
        Ok(Some(Exchange::new(key, conversation, rendered)))
    }

    /// Clean the reply, append it, and account for the exchange.
    async fn finish(&self, exchange: Exchange, raw: &str) -> (String, Usage) {
        let reply = scrub_reply(raw, &self.options.stop, &exchange.conversation().user_name);
        let usage = Usage::new(
            exchange.key.clone(),
            exchange.prompt.prompt_tokens as u64,
            self.builder.tokenizer().count(raw) as u64,
        );
        let conversation = exchange.conversation().id.clone();
        exchange.commit(&reply);

        let cost = usage.cost(self.options.price);
        self.keys
            .record_usage(&usage.key, usage.total_tokens, cost)
            .await;
        self.tracker.lock().await.record(&usage, self.options.price);

        info!(
            conversation = %conversation,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "exchange complete"
        );
        (reply, usage)
    }
}
