//! Validation for chat options and transport settings.

use crate::schema::{ChatOptions, ConverseConfig};

use super::helpers::{validate_non_empty, validate_range, validate_range_f64};

/// Validate sampling parameters and the token budget.
pub(crate) fn validate_options(errors: &mut Vec<String>, options: &ChatOptions) {
    validate_non_empty(errors, "options.model", &options.model);
    validate_non_empty(errors, "options.endpoint", &options.endpoint);
    validate_range_f64(errors, "options.temperature", options.temperature, 0.0, 2.0);
    validate_range_f64(errors, "options.top_p", options.top_p, 0.0, 1.0);
    validate_range_f64(
        errors,
        "options.frequency_penalty",
        options.frequency_penalty,
        -2.0,
        2.0,
    );
    validate_range_f64(
        errors,
        "options.presence_penalty",
        options.presence_penalty,
        -2.0,
        2.0,
    );

    if options.price < 0.0 || options.price.is_nan() {
        errors.push(format!("options.price = {} must be >= 0", options.price));
    }
    if options.max_tokens == 0 {
        errors.push("options.max_tokens must be at least 1".into());
    }
    if options.max_tokens >= options.max_conversation_tokens {
        errors.push(format!(
            "options.max_tokens = {} leaves no room for a prompt within max_conversation_tokens = {}",
            options.max_tokens, options.max_conversation_tokens
        ));
    }
}

/// Validate transport timeouts.
pub(crate) fn validate_transport(errors: &mut Vec<String>, config: &ConverseConfig) {
    validate_range(
        errors,
        "transport.connect_timeout_secs",
        config.transport.connect_timeout_secs,
        1,
        600,
    );
    validate_range(
        errors,
        "transport.request_timeout_secs",
        config.transport.request_timeout_secs,
        1,
        600,
    );
}
