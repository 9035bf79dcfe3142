//! Error types for the client crate.

use std::time::Duration;

/// Errors raised below the request wrapper: configuration, transport and
/// encoding failures.
///
/// Callers of the wrapped API methods never see these directly; they are
/// folded into a `RequestOutcome::NotificationError`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The configured API base URL cannot be used.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A configuration value could not be parsed.
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    /// The TCP connection to the API could not be established.
    #[error("connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// HTTP-level failure while sending the request or reading the response.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The API did not answer within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The CSRF refresh endpoint did not hand out a token.
    #[error("CSRF token refresh failed: {0}")]
    CsrfRefresh(String),

    /// A request body could not be encoded.
    #[error("encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}
