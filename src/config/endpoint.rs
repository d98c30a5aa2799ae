//! Upstream endpoint selection.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;

use crate::error::ConfigError;

/// Which upstream the relay talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// The hosted PromptHouse API.
    #[default]
    Web,
    /// A development server on localhost.
    Local,
    /// An endpoint given by `PROMPTHOUSE_CUSTOM_URL` / `--custom-url`.
    Custom,
}

impl Mode {
    /// Returns the configuration name of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Local => "local",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "local" => Ok(Self::Local),
            "custom" => Ok(Self::Custom),
            other => Err(ConfigError::ValidationError {
                message: format!("Invalid mode '{other}'. Must be one of: web, local, custom"),
            }),
        }
    }
}

/// URL scheme of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// Port used when none is given.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }

    /// The protocol in `scheme:` form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http:",
            Self::Https => "https:",
        }
    }
}

/// Where upstream requests are sent.
///
/// Resolved once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or address.
    pub hostname: String,
    /// Request path, always starting with `/`.
    pub path: String,
    /// URL scheme.
    pub protocol: Protocol,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// The hosted PromptHouse API.
    #[must_use]
    pub fn web() -> Self {
        Self {
            hostname: "prompthouse.app".to_string(),
            path: "/api/mcp-link".to_string(),
            protocol: Protocol::Https,
            port: 443,
        }
    }

    /// A local development server.
    #[must_use]
    pub fn local() -> Self {
        Self {
            hostname: "localhost".to_string(),
            path: "/mcp-link".to_string(),
            protocol: Protocol::Http,
            port: 3001,
        }
    }

    /// Parses a custom endpoint URL.
    ///
    /// Only the scheme, host, port and path are kept.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the URL is malformed, has no host, or
    /// uses a scheme other than `http`/`https`.
    pub fn from_url(raw: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw).map_err(|e| ConfigError::ValidationError {
            message: format!("Invalid custom URL '{raw}': {e}"),
        })?;

        let protocol = match url.scheme() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            other => {
                return Err(ConfigError::ValidationError {
                    message: format!("Unsupported custom URL scheme '{other}'"),
                })
            }
        };

        let hostname = url
            .host_str()
            .ok_or_else(|| ConfigError::ValidationError {
                message: format!("Custom URL '{raw}' has no host"),
            })?
            .to_string();

        Ok(Self {
            hostname,
            path: url.path().to_string(),
            port: url.port().unwrap_or_else(|| protocol.default_port()),
            protocol,
        })
    }

    /// The built-in endpoint for a mode; `None` for [`Mode::Custom`].
    #[must_use]
    pub fn for_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Web => Some(Self::web()),
            Mode::Local => Some(Self::local()),
            Mode::Custom => None,
        }
    }

    /// Builds the request URL with the access link as a query parameter.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the endpoint does not form a valid URL.
    pub fn request_url(&self, access_link: &AccessLink) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.to_string()).map_err(|e| ConfigError::ValidationError {
            message: format!("Invalid endpoint '{self}': {e}"),
        })?;
        url.query_pairs_mut()
            .append_pair("accessLink", access_link.expose());
        Ok(url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}//{}:{}{}",
            self.protocol.as_str(),
            self.hostname,
            self.port,
            self.path
        )
    }
}

/// The credential appended to every upstream request.
///
/// `Debug` is redacted so the value cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessLink(String);

impl AccessLink {
    /// Wraps a credential, rejecting blank values.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw credential, for building the request URL only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessLink(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!("web".parse::<Mode>().unwrap(), Mode::Web);
        assert_eq!("LOCAL".parse::<Mode>().unwrap(), Mode::Local);
        assert_eq!(" custom ".parse::<Mode>().unwrap(), Mode::Custom);
        assert!("staging".parse::<Mode>().is_err());
    }

    #[test]
    fn web_endpoint_display() {
        assert_eq!(
            Endpoint::web().to_string(),
            "https://prompthouse.app:443/api/mcp-link"
        );
    }

    #[test]
    fn local_endpoint_display() {
        assert_eq!(
            Endpoint::local().to_string(),
            "http://localhost:3001/mcp-link"
        );
    }

    #[test]
    fn custom_url_default_port() {
        let endpoint = Endpoint::from_url("https://api.example.com/v1/mcp").unwrap();
        assert_eq!(endpoint.hostname, "api.example.com");
        assert_eq!(endpoint.path, "/v1/mcp");
        assert_eq!(endpoint.protocol, Protocol::Https);
        assert_eq!(endpoint.port, 443);
    }

    #[test]
    fn custom_url_explicit_port() {
        let endpoint = Endpoint::from_url("http://127.0.0.1:8080/mcp-link").unwrap();
        assert_eq!(endpoint.port, 8080);
        assert_eq!(endpoint.protocol, Protocol::Http);
    }

    #[test]
    fn custom_url_rejects_other_schemes() {
        assert!(Endpoint::from_url("ftp://example.com/x").is_err());
        assert!(Endpoint::from_url("not a url").is_err());
    }

    #[test]
    fn request_url_carries_access_link() {
        let link = AccessLink::new("abc_123").unwrap();
        let url = Endpoint::local().request_url(&link).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3001/mcp-link?accessLink=abc_123"
        );
    }

    #[test]
    fn request_url_encodes_access_link() {
        let link = AccessLink::new("a&b=c").unwrap();
        let url = Endpoint::web().request_url(&link).unwrap();
        assert_eq!(url.query(), Some("accessLink=a%26b%3Dc"));
    }

    #[test]
    fn access_link_rejects_blank() {
        assert!(AccessLink::new("").is_none());
        assert!(AccessLink::new("   ").is_none());
    }

    #[test]
    fn access_link_is_trimmed() {
        let link = AccessLink::new("  link-value\n").unwrap();
        assert_eq!(link.expose(), "link-value");
    }

    #[test]
    fn access_link_debug_is_redacted() {
        let link = AccessLink::new("secret-value").unwrap();
        assert!(!format!("{link:?}").contains("secret-value"));
    }
}
