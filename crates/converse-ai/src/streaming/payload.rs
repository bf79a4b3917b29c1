//! Payload unwrapping: pull the text delta out of one SSE JSON payload.

use converse_config::PromptStyle;

use crate::AiError;

const PAYLOAD_PREVIEW_CHARS: usize = 200;

/// Extract the incremental text carried by `payload`.
///
/// Completion payloads carry it in `choices[0].text`, chat payloads in
/// `choices[0].delta.content`. Payloads without text (role-only deltas,
/// finish markers) yield `Ok(None)`. Unparseable JSON is
/// [`AiError::MalformedStreamPayload`].
pub fn extract_delta(payload: &str, style: PromptStyle) -> Result<Option<String>, AiError> {
    let json: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| AiError::MalformedStreamPayload {
            payload: payload.chars().take(PAYLOAD_PREVIEW_CHARS).collect(),
            reason: e.to_string(),
        })?;

    let choice = &json["choices"][0];
    let text = match style {
        PromptStyle::Completion => choice["text"].as_str(),
        PromptStyle::Chat => choice["delta"]["content"].as_str(),
    };

    Ok(text.filter(|t| !t.is_empty()).map(String::from))
}
