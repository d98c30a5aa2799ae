//! Error types for prompthouse-mcp.
//!
//! # Security Note
//!
//! Error messages are carefully crafted to NEVER include the access link.
//! Variants that describe the upstream endpoint carry only the
//! credential-free URL, and configuration errors name the offending field
//! rather than its value when the field is the credential.

use std::path::PathBuf;

use thiserror::Error;

use crate::mcp::protocol::RequestId;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },

    /// No access link was supplied by any configuration source.
    #[error("PROMPTHOUSE_ACCESS_LINK environment variable is required")]
    MissingAccessLink,
}

/// A line that could not be turned into a JSON-RPC message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// The line is not valid JSON.
    #[error("invalid JSON: {detail}")]
    Parse {
        /// Parser message.
        detail: String,
        /// Leading slice of the offending line.
        preview: String,
    },

    /// The line is JSON but not a usable JSON-RPC message.
    #[error("invalid request: {reason}")]
    Invalid {
        /// The request id, when it could be read.
        id: RequestId,
        /// Method name, when it could be read.
        method: Option<String>,
        /// What was wrong with the message.
        reason: &'static str,
    },
}

/// Failures talking to the upstream API.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// No complete response within the configured duration.
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// Connection refused, DNS failure, TLS failure and similar.
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The upstream answered 2xx with nothing in the body.
    #[error("empty response from upstream")]
    EmptyResponse,

    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}: {excerpt}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        excerpt: String,
    },

    /// The body is not valid JSON.
    #[error("invalid JSON response: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The body is valid JSON but not a JSON-RPC object.
    #[error("unexpected response body: expected a JSON object")]
    UnexpectedBody,

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The configured endpoint does not form a valid request URL.
    #[error("invalid upstream endpoint: {0}")]
    Endpoint(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn missing_access_link_names_variable() {
        let msg = ConfigError::MissingAccessLink.to_string();
        assert!(msg.contains("PROMPTHOUSE_ACCESS_LINK"));
    }

    #[test]
    fn upstream_status_display() {
        let error = UpstreamError::Status {
            status: 502,
            excerpt: "bad gateway".to_string(),
        };
        assert_eq!(error.to_string(), "upstream returned HTTP 502: bad gateway");
    }

    #[test]
    fn timeout_display() {
        let error = UpstreamError::Timeout { timeout_ms: 10_000 };
        assert_eq!(error.to_string(), "request timeout after 10000ms");
    }
}
