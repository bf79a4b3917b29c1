//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use crate::schema::{LogLevel, PromptStyle};
use converse_common::ConfigError;
use std::path::{Path, PathBuf};

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_converse_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[options]
model = "text-davinci-003"
style = "completion"
endpoint = "https://api.openai.com/v1/completions"

[transport]
request_timeout_secs = 30
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    let options = config.effective_options();
    assert_eq!(options.model, "text-davinci-003");
    assert_eq!(options.style, PromptStyle::Completion);
    assert_eq!(config.transport.request_timeout_secs, 30);
    // Defaults preserved
    assert_eq!(options.max_tokens, 512);
    assert_eq!(config.transport.connect_timeout_secs, 10);
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_config_with_invalid_values_returns_parsed_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[options]
temperature = 9.5
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.options.temperature, Some(9.5));
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("converse").join("config.toml");

    assert!(create_default_config(&path).unwrap());
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.effective_options().ai_name, "ChatGPT");
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::ConverseConfig;

    let config: ConverseConfig = toml::from_str(&default_config_toml()).unwrap();
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn create_default_config_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[options]\nmodel = \"gpt-4\"\n").unwrap();

    assert!(!create_default_config(&path).unwrap());
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.effective_options().model, "gpt-4");
}

#[test]
fn explicit_path_wins_over_config_dir() {
    use super::paths::resolve_config_path;

    let path = resolve_config_path(
        Some("/etc/converse.toml".into()),
        Some(PathBuf::from("/home/ada/.config")),
    )
    .unwrap();
    assert_eq!(path, PathBuf::from("/etc/converse.toml"));

    let path = resolve_config_path(Some("".into()), Some(PathBuf::from("/home/ada/.config"))).unwrap();
    assert_eq!(path, PathBuf::from("/home/ada/.config/converse/config.toml"));

    assert!(matches!(
        resolve_config_path(None, None),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn default_config_path_is_reasonable() {
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("converse"));
        assert!(path_str.ends_with("config.toml"));
    }
}
