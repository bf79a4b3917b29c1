//! Full configuration validation.
//!
//! Option rules run against the effective options (overrides applied to
//! defaults), so an override is checked in the context it will be used.
//! All errors are collected into a single `ConfigError`.

mod helpers;
mod options;


use crate::schema::ConverseConfig;
use converse_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ConverseConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    options::validate_options(&mut errors, &config.effective_options());
    options::validate_transport(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
