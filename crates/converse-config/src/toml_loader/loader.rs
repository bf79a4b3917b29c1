//! Reading and parsing config files.

use std::io::ErrorKind;
use std::path::Path;

use converse_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::ConverseConfig;
use crate::validation;

/// Parse the TOML file at `path`.
///
/// Absent sections and fields take their defaults. Validation problems are
/// logged, not returned: the parsed config comes back as written so the
/// caller decides whether to enforce it.
pub fn load_from_path(path: &Path) -> Result<ConverseConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("cannot read {}: {e}", path.display())),
    })?;

    let config: ConverseConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "config has invalid values: {e}");
    }

    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Load from [`default_config_path`], writing the template first if no
/// file is there yet.
pub fn load_default() -> Result<ConverseConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(&path)?;
            Ok(ConverseConfig::default())
        }
        other => other,
    }
}
