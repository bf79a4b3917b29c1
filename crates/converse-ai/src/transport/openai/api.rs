//! Transport trait implementation for OpenAiClient.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use tracing::debug;

use crate::transport::{ByteStream, CompletionRequest, Transport};
use crate::AiError;

use super::client::{parse_flagged, parse_reply, OpenAiClient};

#[async_trait]
impl Transport for OpenAiClient {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, AiError> {
        let response = self.post(&request.endpoint, api_key, &request.body).await?;
        let json: serde_json::Value = response.json().await?;
        parse_reply(&json, request.style)
    }

    async fn complete_streaming(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<ByteStream, AiError> {
        let response = self.post(&request.endpoint, api_key, &request.body).await?;
        debug!(status = %response.status(), "OpenAI stream opened");

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(AiError::from));
        Ok(Box::pin(stream))
    }

    async fn moderate(&self, api_key: &str, input: &str) -> Result<bool, AiError> {
        let body = json!({ "input": input });
        let response = self
            .post(&self.config.moderation_endpoint, api_key, &body)
            .await?;
        let json: serde_json::Value = response.json().await?;
        parse_flagged(&json)
    }
}
