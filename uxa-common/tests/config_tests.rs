//! Unit tests for configuration resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate UXA_CONFIG or API key variables are marked with #[serial].

use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::TempDir;
use uxa_common::config::{load_config, resolve_config_file, resolve_secret, LoggingConfig};
use uxa_common::Error;

#[derive(Debug, Default, Deserialize)]
struct SampleConfig {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    api_key: Option<String>,
}

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
#[serial]
fn test_cli_path_takes_priority_over_env() {
    let dir = TempDir::new().unwrap();
    let cli_path = write_config(&dir, "[logging]\nlevel = \"debug\"\n");
    env::set_var("UXA_TEST_CONFIG", "/definitely/not/here.toml");

    let resolved = resolve_config_file(Some(&cli_path), "UXA_TEST_CONFIG").unwrap();
    assert_eq!(resolved, Some(cli_path));

    env::remove_var("UXA_TEST_CONFIG");
}

#[test]
#[serial]
fn test_missing_cli_path_is_an_error() {
    let result = resolve_config_file(
        Some(std::path::Path::new("/definitely/not/here.toml")),
        "UXA_TEST_CONFIG",
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_path_is_used_when_no_cli_arg() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "api_key = \"from-toml\"\n");
    env::set_var("UXA_TEST_CONFIG", &path);

    let (config, source): (SampleConfig, _) = load_config(None, "UXA_TEST_CONFIG").unwrap();
    assert_eq!(source, Some(path));
    assert_eq!(config.api_key.as_deref(), Some("from-toml"));
    assert_eq!(config.logging.level, "info");

    env::remove_var("UXA_TEST_CONFIG");
}

#[test]
#[serial]
fn test_malformed_toml_reports_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "this is = = not toml");

    let result: Result<(SampleConfig, _), _> = load_config(Some(&path), "UXA_TEST_CONFIG");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_secret_prefers_environment() {
    env::set_var("UXA_TEST_KEY", "env-key");
    let key = resolve_secret("Test key", "UXA_TEST_KEY", Some("toml-key")).unwrap();
    assert_eq!(key, "env-key");
    env::remove_var("UXA_TEST_KEY");
}

#[test]
#[serial]
fn test_secret_falls_back_to_toml_and_ignores_blank_env() {
    env::set_var("UXA_TEST_KEY", "   ");
    let key = resolve_secret("Test key", "UXA_TEST_KEY", Some("toml-key")).unwrap();
    assert_eq!(key, "toml-key");
    env::remove_var("UXA_TEST_KEY");
}

#[test]
#[serial]
fn test_missing_secret_names_the_variable() {
    env::remove_var("UXA_TEST_KEY");
    let err = resolve_secret("Test key", "UXA_TEST_KEY", None).unwrap_err();
    assert!(err.to_string().contains("UXA_TEST_KEY"));
}
