//! Configuration loading and path resolution
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`~/.config/uxa/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! Secrets (API keys) resolve ENV → TOML.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "UXA_CONFIG";

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    /// Parent directory for private per-run working directories
    pub work_dir: PathBuf,
    /// Stable location deliverables are copied to
    pub output_dir: PathBuf,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary runs on
    pub fn for_current_platform() -> Self {
        let output_dir = dirs::data_local_dir()
            .map(|d| d.join("uxa").join("analysis_outputs"))
            .unwrap_or_else(|| PathBuf::from("./analysis_outputs"));

        Self {
            work_dir: std::env::temp_dir().join("uxa-runs"),
            output_dir,
        }
    }
}

/// Per-user config file location (`<config_dir>/uxa/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("uxa").join("config.toml"))
}

/// Resolve which config file (if any) should be loaded
///
/// An explicitly named file (CLI or ENV) must exist. The per-user default
/// location is optional: when absent, `Ok(None)` tells the caller to use
/// compiled defaults.
pub fn resolve_config_file(cli_arg: Option<&Path>, env_var_name: &str) -> Result<Option<PathBuf>> {
    if let Some(path) = cli_arg {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file given on command line does not exist: {}",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            let path = PathBuf::from(value);
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file named by {} does not exist: {}",
                    env_var_name,
                    path.display()
                )));
            }
            return Ok(Some(path));
        }
    }

    Ok(default_config_path().filter(|p| p.exists()))
}

/// Parse a TOML file into `T`
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve and load configuration, falling back to `T::default()`
///
/// Returns the loaded value plus the path it came from (None for defaults).
pub fn load_config<T>(cli_arg: Option<&Path>, env_var_name: &str) -> Result<(T, Option<PathBuf>)>
where
    T: DeserializeOwned + Default,
{
    match resolve_config_file(cli_arg, env_var_name)? {
        Some(path) => {
            let config = load_toml_file(&path)?;
            info!("Configuration loaded from {}", path.display());
            Ok((config, Some(path)))
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok((T::default(), None))
        }
    }
}

/// Resolve a secret (API key) from environment, then TOML
///
/// **Priority:** ENV → TOML. Warns when both sources carry a value.
pub fn resolve_secret(name: &str, env_var: &str, toml_value: Option<&str>) -> Result<String> {
    let env_value = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_value = toml_value.filter(|k| is_valid_key(k));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment ({}) and TOML config. Using environment.",
            name, env_var
        );
    }

    if let Some(key) = env_value {
        info!("{} loaded from environment variable", name);
        return Ok(key);
    }

    if let Some(key) = toml_value {
        info!("{} loaded from TOML config", name);
        return Ok(key.to_string());
    }

    Err(Error::Config(format!(
        "{name} not configured. Please configure using one of:\n\
         1. Environment: {env_var}=your-key-here\n\
         2. TOML config: {} (api_key = \"your-key\")",
        default_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "config.toml".to_string())
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
