//! Converse configuration system.
//!
//! Provides the chat option schema with field-by-field overrides, TOML
//! loading and validation. Every section uses defaults so partial configs
//! work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use converse_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! let options = config.effective_options();
//! println!("{} via {}", options.model, options.endpoint);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    apply_defaults, ChatOptions, ChatOptionsOverrides, ConverseConfig, LogLevel, LoggingConfig,
    PromptStyle, TransportConfig, CONFIG_SCHEMA_VERSION, DEFAULT_INSTRUCTIONS,
};
pub use toml_loader::{create_default_config, default_config_path, load_default, load_from_path};

use converse_common::ConfigError;

/// Load config from the platform default path and validate it.
///
/// Creates a commented default file if none exists yet.
pub fn load_config() -> Result<ConverseConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &ConverseConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&ConverseConfig::default());
        assert!(json.contains("\"options\""));
        assert!(json.contains("\"transport\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn overrides_round_trip_through_json() {
        let mut config = ConverseConfig::default();
        config.options.model = Some("gpt-4".into());
        let json = config_to_json(&config);
        let parsed: ConverseConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.options.model.as_deref(), Some("gpt-4"));
        assert!(parsed.options.temperature.is_none());
    }
}
