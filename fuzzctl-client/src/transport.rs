//! Transport abstraction trait.
//!
//! Lets the request wrapper run against the real HTTP client or a scripted
//! stand-in without changing the retry logic.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::ClientConfig;
use crate::http::{build_client, send_request};
use crate::request::{ApiRequest, HttpResponse};
use crate::ClientError;

/// Sends a single request and returns whatever the server answered.
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
/// They must not interpret HTTP statuses: a 4xx or 5xx is still `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the raw response.
    ///
    /// # Errors
    /// Returns a [`ClientError`] when no response was received at all.
    async fn send(&self, request: ApiRequest) -> Result<HttpResponse, ClientError>;
}

/// HTTP transport over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for `config`.
    ///
    /// # Errors
    /// Returns [`ClientError::Http`] if the underlying client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.clone(),
            timeout: config.timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<HttpResponse, ClientError> {
        send_request(&self.client, &self.base_url, self.timeout, request).await
    }
}
