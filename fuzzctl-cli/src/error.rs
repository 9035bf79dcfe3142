//! Error types for the command-line driver.

use std::path::PathBuf;

use fuzzctl_client::ClientError;
use fuzzctl_core::{CoreError, RequestOutcome};

/// Errors that end a `fuzzctl` invocation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CliError {
    /// Configuration or transport setup failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A resource selection failed the local limit check.
    #[error(transparent)]
    Limits(#[from] CoreError),

    /// Neither the flag nor the environment variable supplied a credential.
    #[error("missing {what}: pass --{what} or set {env}")]
    MissingCredential { what: &'static str, env: &'static str },

    /// The logged-in user has no project to work in.
    #[error("user {0} has no project")]
    NoProject(String),

    /// A file to upload could not be read.
    #[error("read {}: {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },

    /// The API refused or failed the request.
    #[error("{place}: {message}")]
    Rejected { place: String, message: String },

    /// Output could not be rendered as JSON.
    #[error("render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Unwrap a successful outcome, turning any other into [`CliError::Rejected`].
    ///
    /// # Errors
    /// Returns [`CliError::Rejected`] naming the slot the error was routed to.
    pub fn check<T>(outcome: RequestOutcome<T>) -> Result<T, Self> {
        let (place, message) = match outcome {
            RequestOutcome::Success(value) => return Ok(value),
            RequestOutcome::FieldError { field, message } => (format!("field '{field}'"), message),
            RequestOutcome::CommonError(message) => ("form".to_owned(), message),
            RequestOutcome::NotificationError(message) => ("error".to_owned(), message),
        };
        Err(Self::Rejected { place, message })
    }
}
