//! Where the config file lives, and writing the commented template there.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use converse_common::ConfigError;
use tracing::{debug, info};

use super::template::default_config_toml;

/// Environment variable that points at a config file explicitly.
pub const CONFIG_PATH_ENV: &str = "CONVERSE_CONFIG";

/// `$CONVERSE_CONFIG` if set, else `<config dir>/converse/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    resolve_config_path(std::env::var_os(CONFIG_PATH_ENV), dirs::config_dir())
}

pub(crate) fn resolve_config_path(
    explicit: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    config_dir
        .map(|dir| dir.join("converse").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))
}

/// Write the commented default config to `path`, creating parent
/// directories. An existing file is left alone; returns whether a file was
/// written.
pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        debug!(path = %path.display(), "config already present, not overwriting");
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    std::fs::write(path, default_config_toml())
        .map_err(|e| ConfigError::ParseError(format!("cannot write {}: {e}", path.display())))?;

    info!(path = %path.display(), "wrote default config");
    Ok(true)
}
