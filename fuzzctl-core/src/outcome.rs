//! The single error contract every wrapped API call resolves to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Message shown for failures no caller could attribute.
pub const INTERNAL_SERVER_ERROR: &str = "internal server error";

/// Form fields an error can be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum FormField {
    Name,
    Description,
    Image,
    Cpu,
    Ram,
    Tmpfs,
    Binaries,
    Config,
    Seeds,
}

impl FormField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Image => "image",
            Self::Cpu => "cpu",
            Self::Ram => "ram",
            Self::Tmpfs => "tmpfs",
            Self::Binaries => "binaries",
            Self::Config => "config",
            Self::Seeds => "seeds",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" => Self::Name,
            "description" => Self::Description,
            "image" => Self::Image,
            "cpu" => Self::Cpu,
            "ram" => Self::Ram,
            "tmpfs" => Self::Tmpfs,
            "binaries" => Self::Binaries,
            "config" => Self::Config,
            "seeds" => Self::Seeds,
            other => return Err(CoreError::UnknownField { name: other.to_owned() }),
        })
    }
}

/// Where an error message should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSlot {
    /// Next to a single form field.
    Field(FormField),
    /// Above the form, for errors that concern the whole form.
    Common,
    /// As a transient notification, for system and transport errors.
    Notification,
}

/// Normalized result of a wrapped API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome<T> {
    Success(T),
    FieldError { field: FormField, message: String },
    CommonError(String),
    NotificationError(String),
}

impl<T> RequestOutcome<T> {
    /// Build the error outcome for a message routed to `slot`.
    pub fn from_slot(slot: ErrorSlot, message: impl Into<String>) -> Self {
        let message = message.into();
        match slot {
            ErrorSlot::Field(field) => Self::FieldError { field, message },
            ErrorSlot::Common => Self::CommonError(message),
            ErrorSlot::Notification => Self::NotificationError(message),
        }
    }

    /// The generic notification for unclassified failures.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::NotificationError(INTERNAL_SERVER_ERROR.to_owned())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The slot an error outcome is routed to, `None` on success.
    #[must_use]
    pub fn slot(&self) -> Option<ErrorSlot> {
        match self {
            Self::Success(_) => None,
            Self::FieldError { field, .. } => Some(ErrorSlot::Field(*field)),
            Self::CommonError(_) => Some(ErrorSlot::Common),
            Self::NotificationError(_) => Some(ErrorSlot::Notification),
        }
    }

    /// The error message, `None` on success.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::FieldError { message, .. }
            | Self::CommonError(message)
            | Self::NotificationError(message) => Some(message.as_str()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestOutcome<U> {
        match self {
            Self::Success(value) => RequestOutcome::Success(f(value)),
            Self::FieldError { field, message } => RequestOutcome::FieldError { field, message },
            Self::CommonError(message) => RequestOutcome::CommonError(message),
            Self::NotificationError(message) => RequestOutcome::NotificationError(message),
        }
    }

    /// Split into the success value or the same error outcome retyped.
    ///
    /// Lets multi-step flows bail out on the first failing step.
    ///
    /// # Errors
    /// Returns the error outcome unchanged (apart from its type parameter).
    pub fn into_result<U>(self) -> Result<T, RequestOutcome<U>> {
        match self {
            Self::Success(value) => Ok(value),
            Self::FieldError { field, message } => {
                Err(RequestOutcome::FieldError { field, message })
            }
            Self::CommonError(message) => Err(RequestOutcome::CommonError(message)),
            Self::NotificationError(message) => Err(RequestOutcome::NotificationError(message)),
        }
    }
}

impl<T> From<CoreError> for RequestOutcome<T> {
    /// Local validation failures concern the whole form.
    fn from(err: CoreError) -> Self {
        Self::CommonError(err.to_string())
    }
}
