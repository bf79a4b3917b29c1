//! OpenAI transport configuration.

use std::time::Duration;

use converse_config::TransportConfig;

pub(crate) const MODERATION_URL: &str = "https://api.openai.com/v1/moderations";

/// HTTP settings for [`OpenAiClient`](super::OpenAiClient).
///
/// The completion endpoint travels with each request (it is an option of
/// the exchange), so only the moderation endpoint lives here.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    pub moderation_endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self::from_transport(&TransportConfig::default())
    }
}

impl OpenAiConfig {
    pub fn from_transport(transport: &TransportConfig) -> Self {
        Self {
            moderation_endpoint: MODERATION_URL.to_string(),
            connect_timeout: Duration::from_secs(u64::from(transport.connect_timeout_secs)),
            request_timeout: Duration::from_secs(u64::from(transport.request_timeout_secs)),
        }
    }

    pub fn with_moderation_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.moderation_endpoint = endpoint.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_transport_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.moderation_endpoint, MODERATION_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn from_transport_converts_seconds() {
        let config = OpenAiConfig::from_transport(&TransportConfig {
            connect_timeout_secs: 3,
            request_timeout_secs: 30,
        })
        .with_moderation_endpoint("http://localhost/mod");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.moderation_endpoint, "http://localhost/mod");
    }
}
