//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::ClientError;

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "FUZZCTL_API_URL";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "FUZZCTL_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the control-panel API.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    /// Base URL every API path is resolved against, `http` or `https`.
    pub base_url: Url,

    /// Upper bound on a single request, connection included.
    pub timeout: Duration,

    /// Header carrying the CSRF token, on requests and on refresh responses.
    pub csrf_header: String,
}

impl ClientConfig {
    /// Create a config for `base_url` with default timeout and header.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidBaseUrl`] if the URL does not parse, is
    /// not `http` or `https`, or has no host.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            timeout: DEFAULT_TIMEOUT,
            csrf_header: "x-csrf-token".to_owned(),
        })
    }

    /// Read `FUZZCTL_API_URL` and `FUZZCTL_TIMEOUT_SECS`, falling back to
    /// `http://127.0.0.1:8080/` and 30 seconds.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidBaseUrl`] or [`ClientError::InvalidConfig`]
    /// if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ClientError> {
        let url = std::env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        let mut config = Self::new(&url)?;
        if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
            config.timeout = parse_timeout_secs(&secs)?;
        }
        Ok(config)
    }

    /// Replace the base URL, keeping the other settings.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidBaseUrl`] under the same rules as
    /// [`ClientConfig::new`].
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ClientError> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidBaseUrl { url: raw.to_owned(), reason };

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_owned()));
    }
    // Relative API paths must resolve below the base path, not beside it.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_timeout_secs(raw: &str) -> Result<Duration, ClientError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ClientError::InvalidConfig {
            key: ENV_TIMEOUT_SECS,
            reason: "timeout must be positive".to_owned(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ClientError::InvalidConfig { key: ENV_TIMEOUT_SECS, reason: e.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_appends_trailing_slash_to_base_path() {
        let config = match ClientConfig::new("http://panel.local:3000/ui") {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(config.base_url.as_str(), "http://panel.local:3000/ui/");
        assert_eq!(config.csrf_header, "x-csrf-token");
    }

    #[test]
    fn new_accepts_https() {
        let config = match ClientConfig::new("https://panel.local") {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(config.base_url.as_str(), "https://panel.local/");
    }

    #[test]
    fn new_rejects_other_schemes_and_garbage() {
        assert!(matches!(
            ClientConfig::new("ftp://panel.local"),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(ClientConfig::new("not a url"), Err(ClientError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn default_url_points_at_localhost() {
        let config = match ClientConfig::new(DEFAULT_API_URL) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(config.base_url.host_str(), Some("127.0.0.1"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn timeout_parsing_rejects_zero_and_text() {
        assert_eq!(parse_timeout_secs(" 5 ").ok(), Some(Duration::from_secs(5)));
        assert!(parse_timeout_secs("0").is_err());
        assert!(parse_timeout_secs("soon").is_err());
    }
}
