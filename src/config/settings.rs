//! Configuration structures.
//!
//! [`Config`] maps directly to the JSON configuration file format.
//! [`RelayConfig`] is the resolved, validated configuration the relay runs
//! with, built once at startup from CLI flags, environment variables, the
//! config file, and built-in defaults, in that order of precedence.

use std::time::Duration;

use serde::Deserialize;

use crate::config::endpoint::{AccessLink, Endpoint, Mode};
use crate::error::ConfigError;

/// Default upstream request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default number of retries after a connection failure.
pub const DEFAULT_RETRIES: u32 = 3;

/// Root configuration file structure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// PromptHouse access link.
    #[serde(default)]
    pub access_link: Option<String>,

    /// Upstream mode: "web", "local" or "custom".
    #[serde(default)]
    pub mode: Option<String>,

    /// Endpoint URL used in custom mode.
    #[serde(default)]
    pub custom_url: Option<String>,

    /// Include diagnostic data in error responses.
    #[serde(default)]
    pub debug: Option<bool>,

    /// Upstream request timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Retries after a connection failure.
    #[serde(default)]
    pub retries: Option<u32>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
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
    "warn".to_string()
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--access-link`.
    pub access_link: Option<String>,
    /// `--mode`.
    pub mode: Option<String>,
    /// `--custom-url`.
    pub custom_url: Option<String>,
    /// `--debug`.
    pub debug: Option<bool>,
    /// `--timeout-ms`.
    pub timeout_ms: Option<u64>,
    /// `--retries`.
    pub retries: Option<u32>,
}

/// The configuration the relay runs with.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Selected upstream mode.
    pub mode: Mode,
    /// Upstream endpoint for `mode`.
    pub endpoint: Endpoint,
    /// Credential for upstream calls.
    pub access_link: AccessLink,
    /// Whether error responses carry diagnostic `data`.
    pub debug: bool,
    /// Per-request upstream timeout.
    pub timeout: Duration,
    /// Retries after a connection failure.
    pub retries: u32,
    /// Log level from the config file.
    pub log_level: String,
}

/// Environment variables read during resolution. Each entry lists the
/// preferred name first, then the name used by the desktop extension bundle.
mod env {
    pub const ACCESS_LINK: &[&str] = &["PROMPTHOUSE_ACCESS_LINK", "access_link"];
    pub const MODE: &[&str] = &["PROMPTHOUSE_MODE", "mode"];
    pub const DEBUG: &[&str] = &["PROMPTHOUSE_DEBUG", "debug"];
    pub const TIMEOUT: &[&str] = &["PROMPTHOUSE_TIMEOUT"];
    pub const RETRIES: &[&str] = &["PROMPTHOUSE_RETRIES"];
    pub const CUSTOM_URL: &[&str] = &["PROMPTHOUSE_CUSTOM_URL"];
}

impl RelayConfig {
    /// Resolves the final configuration.
    ///
    /// Each field takes the first value found in: `cli`, the environment (via
    /// `env_lookup`), `file`, then the built-in default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingAccessLink`] if no source provides an
    /// access link, or a validation error for malformed values.
    pub fn resolve<F>(file: Config, cli: Overrides, env_lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| env_lookup(name).filter(|v| !v.trim().is_empty()))
        };

        let access_link = cli
            .access_link
            .or_else(|| from_env(env::ACCESS_LINK))
            .or(file.access_link)
            .and_then(AccessLink::new)
            .ok_or(ConfigError::MissingAccessLink)?;

        let mode = match cli.mode.or_else(|| from_env(env::MODE)).or(file.mode) {
            Some(raw) => raw.parse::<Mode>()?,
            None => Mode::default(),
        };

        let debug = match cli.debug {
            Some(flag) => flag,
            None => from_env(env::DEBUG).map_or(file.debug.unwrap_or(false), |v| parse_flag(&v)),
        };

        let timeout_ms = match cli.timeout_ms {
            Some(ms) => ms,
            None => match from_env(env::TIMEOUT) {
                Some(raw) => parse_number(env::TIMEOUT[0], &raw)?,
                None => file.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            },
        };

        let retries = match cli.retries {
            Some(n) => n,
            None => match from_env(env::RETRIES) {
                Some(raw) => parse_number(env::RETRIES[0], &raw)?,
                None => file.retries.unwrap_or(DEFAULT_RETRIES),
            },
        };

        let custom_url = cli
            .custom_url
            .or_else(|| from_env(env::CUSTOM_URL))
            .or(file.custom_url);

        let endpoint = match Endpoint::for_mode(mode) {
            Some(endpoint) => endpoint,
            None => {
                let raw = custom_url.ok_or_else(|| ConfigError::ValidationError {
                    message: "custom mode requires PROMPTHOUSE_CUSTOM_URL or --custom-url"
                        .to_string(),
                })?;
                Endpoint::from_url(&raw)?
            }
        };

        let config = Self {
            mode,
            endpoint,
            access_link,
            debug,
            timeout: Duration::from_millis(timeout_ms),
            retries,
            log_level: file.logging.level,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ValidationError {
                message: "timeout must be greater than zero".to_string(),
            });
        }

        // Fails early on an endpoint that cannot form a URL.
        self.endpoint.request_url(&self.access_link)?;
        Ok(())
    }
}

fn parse_flag(raw: &str) -> bool {
    let raw = raw.trim();
    raw.eq_ignore_ascii_case("true") || raw == "1"
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError {
            message: format!("{name} must be a non-negative integer, got '{raw}'"),
        })
}
