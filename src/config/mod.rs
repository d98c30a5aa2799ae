//! Configuration file loading and resolution.
//!
//! Settings come from four places, highest precedence first:
//!
//! 1. Command-line flags
//! 2. Environment variables (`PROMPTHOUSE_*`)
//! 3. The JSON configuration file
//! 4. Built-in defaults
//!
//! # Configuration File Locations
//!
//! The configuration file is optional. It is searched in the following order:
//!
//! 1. Path given as the positional CLI argument
//! 2. Default location:
//!    - **Linux/macOS:** `~/.prompthouse-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.prompthouse-mcp\config.json`

mod endpoint;
mod settings;

pub use endpoint::{AccessLink, Endpoint, Mode, Protocol};
pub use settings::{
    Config, LoggingConfig, Overrides, RelayConfig, DEFAULT_RETRIES, DEFAULT_TIMEOUT_MS,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.prompthouse-mcp/`
/// - **Windows:** `%USERPROFILE%\.prompthouse-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".prompthouse-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, uses the platform-specific default location, and a
/// missing default file yields an empty [`Config`].
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed or has unknown fields
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path,
        source: e,
    })
}

/// Reads a variable from the process environment.
///
/// Passed to [`RelayConfig::resolve`] by the binary; tests pass their own
/// lookup instead of mutating the environment.
#[must_use]
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
