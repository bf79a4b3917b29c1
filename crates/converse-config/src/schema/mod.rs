//! Configuration schema types for Converse.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Chat options are stored as overrides and resolved against the
//! built-in defaults on demand.

mod options;
mod system;

pub use options::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Converse.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConverseConfig {
    pub options: ChatOptionsOverrides,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
}

impl ConverseConfig {
    /// Options with every configured override applied to the defaults.
    pub fn effective_options(&self) -> ChatOptions {
        apply_defaults(&self.options)
    }
}
