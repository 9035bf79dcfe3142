//! REST client for the fuzzing-platform control panel.
//!
//! Sends API requests over HTTP or HTTPS, stamps the session's CSRF token on
//! state-changing calls, and retries once with a fresh token when the server
//! rejects it. Every wrapped call resolves to a
//! [`RequestOutcome`](fuzzctl_core::RequestOutcome). The [`forms`] module
//! drives the create and modify flows of the revision forms on top.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod forms;
mod http;
pub mod models;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;
pub mod wrapper;

#[cfg(test)]
mod testing;

pub use api::Archive;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use forms::{FuzzerDraft, ResourceForm, RevisionFiles, VersionDraft, VersionEdit};
pub use request::{ApiRequest, HttpResponse, UploadFile};
pub use response::{ApiError, RawResponse, TransportFailure};
pub use session::Session;
pub use transport::{HttpTransport, Transport};
pub use wrapper::{CodeTableClassifier, ErrorClassifier};
