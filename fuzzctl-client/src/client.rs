//! The API client: transport, session and error classification bundled.

use std::sync::Arc;

use hyper::HeaderMap;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::request::{ApiRequest, HttpResponse};
use crate::response::RawResponse;
use crate::session::Session;
use crate::transport::{HttpTransport, Transport};
use crate::wrapper::{CodeTableClassifier, ErrorClassifier};
use crate::ClientError;

/// Path of the endpoint that hands out a fresh CSRF token.
pub const CSRF_REFRESH_PATH: &str = "api/v1/security/csrf-token";

/// Client for the control-panel REST API.
///
/// Every state-mutating request is stamped with the session's CSRF token at
/// dispatch time; callers never set the header themselves.
pub struct ApiClient<T = HttpTransport> {
    transport: T,
    session: Arc<Session>,
    classifier: Arc<dyn ErrorClassifier>,
    csrf_header: String,
}

impl ApiClient<HttpTransport> {
    /// Create a client talking HTTP(S) to `config.base_url`.
    ///
    /// # Errors
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(transport).with_csrf_header(&config.csrf_header))
    }
}

impl<T: Transport> ApiClient<T> {
    /// Create a client over `transport` with a fresh session and the default
    /// error classifier.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            session: Arc::new(Session::new()),
            classifier: Arc::new(CodeTableClassifier::new()),
            csrf_header: "x-csrf-token".to_owned(),
        }
    }

    /// Share `session` with other clients.
    #[must_use]
    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = session;
        self
    }

    /// Route server errors to form slots with `classifier`.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl ErrorClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    #[must_use]
    pub fn with_csrf_header(mut self, name: &str) -> Self {
        name.clone_into(&mut self.csrf_header);
        self
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn classifier(&self) -> &dyn ErrorClassifier {
        self.classifier.as_ref()
    }

    /// Stamp the CSRF header on mutating requests and send.
    async fn dispatch(&self, mut request: ApiRequest) -> Result<HttpResponse, ClientError> {
        if request.is_state_mutating() {
            if let Some(token) = self.session.csrf_token() {
                request.set_header(&self.csrf_header, &token)?;
            }
        }
        self.transport.send(request).await
    }

    /// Send one request and classify the answer. No retry.
    pub async fn execute<R: DeserializeOwned>(&self, request: ApiRequest) -> RawResponse<R> {
        self.execute_with_headers(request).await.map(|(payload, _)| payload)
    }

    /// Like [`execute`](Self::execute), also returning the response headers.
    pub async fn execute_with_headers<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> RawResponse<(R, HeaderMap)> {
        match self.dispatch(request).await {
            Ok(response) => {
                RawResponse::from_http(&response).map(|payload| (payload, response.headers))
            }
            Err(e) => e.into(),
        }
    }

    /// Fetch a fresh CSRF token and store it in the session.
    ///
    /// Only the status and the token header are read; the body is ignored.
    ///
    /// # Errors
    /// Returns [`ClientError::CsrfRefresh`] if the endpoint cannot be reached,
    /// answers with a non-success status, or carries no token.
    pub async fn refresh_csrf_token(&self) -> Result<(), ClientError> {
        let response = self
            .dispatch(ApiRequest::get(CSRF_REFRESH_PATH))
            .await
            .map_err(|e| ClientError::CsrfRefresh(e.to_string()))?;

        if !response.status.is_success() {
            return Err(ClientError::CsrfRefresh(format!(
                "refresh endpoint answered {}",
                response.status
            )));
        }

        let token = response
            .header(&self.csrf_header)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ClientError::CsrfRefresh(format!("response has no {} header", self.csrf_header))
            })?;

        self.session.set_csrf_token(token);
        tracing::info!("CSRF token refreshed");
        Ok(())
    }

    /// Store the token a login or refresh response carried, if any.
    pub(crate) fn adopt_csrf_token(&self, headers: &HeaderMap) {
        if let Some(token) = headers.get(self.csrf_header.as_str()).and_then(|v| v.to_str().ok()) {
            self.session.set_csrf_token(token);
        }
    }
}
