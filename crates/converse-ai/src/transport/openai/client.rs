//! OpenAI client struct, request sending, and response parsing.

use converse_config::PromptStyle;
use tracing::debug;

use crate::AiError;

use super::config::OpenAiConfig;

const ERROR_PREVIEW_CHARS: usize = 200;

/// OpenAI API client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    pub(crate) config: OpenAiConfig,
    pub(crate) http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// POST `body` to `url`, turning any non-2xx status into
    /// [`AiError::RemoteRequestFailed`].
    pub(crate) async fn post(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, AiError> {
        debug!(url, "OpenAI request");

        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(AiError::remote(
            Some(status.as_u16()),
            remote_error_message(status, &text),
        ))
    }
}

/// The remote `error.message` if the body carries one, otherwise the
/// status line and the head of the body.
pub(crate) fn remote_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| {
            let head: String = body.chars().take(ERROR_PREVIEW_CHARS).collect();
            format!("HTTP {status}: {head}")
        })
}

/// Reply text of a non-streamed response.
pub(crate) fn parse_reply(json: &serde_json::Value, style: PromptStyle) -> Result<String, AiError> {
    let choice = &json["choices"][0];
    let text = match style {
        PromptStyle::Completion => choice["text"].as_str(),
        PromptStyle::Chat => choice["message"]["content"].as_str(),
    };
    text.map(String::from)
        .ok_or_else(|| AiError::remote(None, "response carried no reply text"))
}

/// `results[0].flagged` of a moderation response.
pub(crate) fn parse_flagged(json: &serde_json::Value) -> Result<bool, AiError> {
    json["results"][0]["flagged"]
        .as_bool()
        .ok_or_else(|| AiError::remote(None, "moderation response carried no verdict"))
}
