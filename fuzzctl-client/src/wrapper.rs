//! Authenticated request wrapper.
//!
//! Runs one API operation, and when the server rejects the CSRF token,
//! refreshes it and runs the operation exactly once more. Whatever happens,
//! the caller gets a [`RequestOutcome`].

use std::collections::HashMap;
use std::future::Future;

use fuzzctl_core::{ErrorSlot, RequestOutcome, INTERNAL_SERVER_ERROR};

use crate::client::ApiClient;
use crate::response::{ApiError, RawResponse};
use crate::transport::Transport;

/// Decides where a server error is shown and with what text.
pub trait ErrorClassifier: Send + Sync {
    /// Route `error` to a field, the form, or a notification.
    fn classify(&self, error: &ApiError) -> ErrorSlot;

    /// User-facing text for `error`.
    fn describe(&self, error: &ApiError) -> String {
        if error.message.is_empty() {
            INTERNAL_SERVER_ERROR.to_owned()
        } else {
            error.message.clone()
        }
    }
}

/// Classifier driven by the error's field hint and a code table.
///
/// An error naming a field goes to that field. Otherwise a code found in the
/// table goes to the mapped slot, any other code is a form-level error, and
/// errors without a code are notifications.
#[derive(Debug, Clone, Default)]
pub struct CodeTableClassifier {
    slots: HashMap<String, ErrorSlot>,
}

impl CodeTableClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route errors with `code` to `slot`.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>, slot: ErrorSlot) -> Self {
        self.slots.insert(code.into(), slot);
        self
    }
}

impl ErrorClassifier for CodeTableClassifier {
    fn classify(&self, error: &ApiError) -> ErrorSlot {
        if let Some(field) = error.field {
            return ErrorSlot::Field(field);
        }
        match &error.code {
            Some(code) => self.slots.get(code).copied().unwrap_or(ErrorSlot::Common),
            None => ErrorSlot::Notification,
        }
    }
}

impl<T: Transport> ApiClient<T> {
    /// Run `op`, refreshing the CSRF token and retrying once if the server
    /// rejects the token.
    ///
    /// `op` may be called twice, so it must build its requests afresh on
    /// every call. The retry's result is final, even if it is again a CSRF
    /// rejection. If the refresh itself fails the operation is not retried.
    pub async fn wrapped<R, F, Fut>(&self, op: F) -> RequestOutcome<R>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = RawResponse<R>>,
    {
        let first = op().await;
        if !first.is_csrf_failure() {
            return first.into_outcome(self.classifier());
        }

        tracing::warn!("CSRF token rejected, refreshing and retrying once");
        if let Err(e) = self.refresh_csrf_token().await {
            tracing::warn!(error = %e, "CSRF token refresh failed");
            return RequestOutcome::internal_error();
        }

        op().await.into_outcome(self.classifier())
    }
}
