//! Discriminated result of a single API exchange.
//!
//! The transport resolves every exchange to exactly one of three shapes: a
//! decoded success payload, a rejection carrying the server's error body, or
//! a transport-level failure. The request wrapper only ever matches on these.

use std::fmt;

use fuzzctl_core::{FormField, RequestOutcome};
use hyper::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::request::HttpResponse;
use crate::wrapper::ErrorClassifier;
use crate::ClientError;

/// Codes the API answers with when the CSRF token is absent or stale.
pub const CSRF_ERROR_CODES: [&str; 3] =
    ["E_CSRF_TOKEN_MISSING", "E_CSRF_TOKEN_MISMATCH", "E_CSRF_TOKEN_INVALID"];

/// An error reported by the API in a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status of the response that carried the error.
    pub status: u16,
    /// Machine-readable error code, e.g. `E_CSRF_TOKEN_MISMATCH`.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Form field the error belongs to, when the failing call knows it.
    pub field: Option<FormField>,
}

impl ApiError {
    /// Parse the error body `{error, code?}` of a rejected response.
    ///
    /// `error` may be a plain message or an object with its own `code` and
    /// `message`. Bodies that are not JSON keep the status reason as message.
    #[must_use]
    pub fn from_body(status: StatusCode, body: &[u8]) -> Self {
        let mut parsed = serde_json::from_slice::<ErrorBody>(body).unwrap_or_default();
        let nested = parsed.error.take().map(NestedError::from).unwrap_or_default();

        let code = parsed.code.or(nested.code);
        let message = nested
            .message
            .or(parsed.message)
            .or_else(|| status.canonical_reason().map(str::to_owned))
            .unwrap_or_default();

        Self { status: status.as_u16(), code, message, field: nested.field }
    }

    /// `true` when the API rejected the request's CSRF token.
    #[must_use]
    pub fn is_csrf_failure(&self) -> bool {
        self.code.as_deref().is_some_and(|code| CSRF_ERROR_CODES.contains(&code))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code} (HTTP {}): {}", self.status, self.message),
            None => write!(f, "HTTP {}: {}", self.status, self.message),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default)]
struct NestedError {
    code: Option<String>,
    message: Option<String>,
    field: Option<FormField>,
}

impl From<Value> for NestedError {
    fn from(value: Value) -> Self {
        match value {
            Value::String(message) => Self { message: Some(message), ..Self::default() },
            Value::Object(map) => {
                let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_owned);
                Self {
                    code: text("code"),
                    message: text("message"),
                    field: text("type").and_then(|t| t.parse().ok()),
                }
            }
            _ => Self::default(),
        }
    }
}

/// A request that never produced a usable answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub reason: String,
}

impl TransportFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl From<ClientError> for TransportFailure {
    fn from(err: ClientError) -> Self {
        Self::new(err.to_string())
    }
}

/// Result of one API exchange before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResponse<T> {
    /// 2xx with a decoded payload.
    Ok(T),
    /// The API answered with an error body.
    Rejected(ApiError),
    /// Connection, timeout, decode or server-side failure.
    Failed(TransportFailure),
}

impl<T: DeserializeOwned> RawResponse<T> {
    /// Classify a wire response.
    ///
    /// 2xx decodes the body as `T` (an empty body decodes as JSON `null`);
    /// 5xx is a transport failure; anything else is a rejection.
    #[must_use]
    pub fn from_http(response: &HttpResponse) -> Self {
        let status = response.status;
        if status.is_success() {
            let body: &[u8] =
                if response.body.is_empty() { &b"null"[..] } else { &response.body[..] };
            return match serde_json::from_slice(body) {
                Ok(payload) => Self::Ok(payload),
                Err(e) => Self::Failed(TransportFailure::new(format!("decode response body: {e}"))),
            };
        }
        if status.is_server_error() {
            return Self::Failed(TransportFailure::new(format!(
                "HTTP {status}: {}",
                String::from_utf8_lossy(&response.body)
            )));
        }
        Self::Rejected(ApiError::from_body(status, &response.body))
    }
}

impl<T> RawResponse<T> {
    /// `true` when the API rejected the request's CSRF token.
    #[must_use]
    pub fn is_csrf_failure(&self) -> bool {
        matches!(self, Self::Rejected(err) if err.is_csrf_failure())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RawResponse<U> {
        match self {
            Self::Ok(value) => RawResponse::Ok(f(value)),
            Self::Rejected(err) => RawResponse::Rejected(err),
            Self::Failed(failure) => RawResponse::Failed(failure),
        }
    }

    /// Split into the payload or the same failure retyped, so multi-request
    /// operations can stop at the first failing exchange.
    ///
    /// # Errors
    /// Returns the rejection or failure unchanged.
    pub fn into_result<U>(self) -> Result<T, RawResponse<U>> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Rejected(err) => Err(RawResponse::Rejected(err)),
            Self::Failed(failure) => Err(RawResponse::Failed(failure)),
        }
    }

    /// Attribute a rejection to `field` unless the server already named one.
    #[must_use]
    pub fn for_field(self, field: FormField) -> Self {
        match self {
            Self::Rejected(mut err) => {
                err.field.get_or_insert(field);
                Self::Rejected(err)
            }
            other => other,
        }
    }

    /// Normalize into the outcome shown to the user.
    pub fn into_outcome(self, classifier: &dyn ErrorClassifier) -> RequestOutcome<T> {
        match self {
            Self::Ok(value) => RequestOutcome::Success(value),
            Self::Rejected(err) => {
                RequestOutcome::from_slot(classifier.classify(&err), classifier.describe(&err))
            }
            Self::Failed(failure) => {
                tracing::warn!(reason = %failure.reason, "API call failed");
                RequestOutcome::internal_error()
            }
        }
    }
}

impl<T> From<ClientError> for RawResponse<T> {
    fn from(err: ClientError) -> Self {
        Self::Failed(err.into())
    }
}
