//! HTTP client for the control-panel API, built on reqwest.
//!
//! Handles `http` and `https` base URLs. JSON bodies go out pre-encoded;
//! uploads are encoded as `multipart/form-data` by reqwest.

use std::time::Duration;

use hyper::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::config::ClientConfig;
use crate::request::{ApiRequest, HttpResponse, RequestBody, UploadFile};
use crate::ClientError;

/// Build the shared reqwest client for `config`.
///
/// # Errors
/// Returns [`ClientError::Http`] if the TLS backend cannot be initialised.
pub(crate) fn build_client(config: &ClientConfig) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| ClientError::Http(format!("build HTTP client: {e}")))
}

/// Send `request` to the API rooted at `base_url`.
///
/// `request.path` is resolved relative to `base_url`; query pairs are
/// percent-encoded. Non-success statuses are returned as responses, not
/// errors: classifying them is the caller's job.
///
/// # Errors
/// Returns [`ClientError::Connect`] if the server cannot be reached,
/// [`ClientError::Timeout`] once `timeout` elapses, and [`ClientError::Http`]
/// on any other send or body-read failure.
pub(crate) async fn send_request(
    client: &reqwest::Client,
    base_url: &Url,
    timeout: Duration,
    request: ApiRequest,
) -> Result<HttpResponse, ClientError> {
    let url = resolve(base_url, &request)?;
    let method = request.method.clone();
    let path = url.path().to_owned();

    let mut builder = client.request(request.method, url.clone()).headers(request.headers);
    builder = match request.body {
        RequestBody::Empty => builder,
        RequestBody::Json(bytes) => builder.header(CONTENT_TYPE, "application/json").body(bytes),
        RequestBody::Multipart { field, file } => builder.multipart(upload_form(field, file)?),
    };

    tracing::debug!(%method, %path, "sending API request");

    let resp = builder.send().await.map_err(|e| transport_error(&url, timeout, &e))?;
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.bytes().await.map_err(|e| transport_error(&url, timeout, &e))?;

    tracing::debug!(%method, %path, %status, "API response received");

    Ok(HttpResponse { status, headers, body })
}

fn upload_form(field: String, file: UploadFile) -> Result<Form, ClientError> {
    let part = Part::bytes(file.content.to_vec())
        .file_name(file.file_name)
        .mime_str("application/octet-stream")
        .map_err(|e| ClientError::Http(format!("build upload part: {e}")))?;
    Ok(Form::new().part(field, part))
}

fn transport_error(url: &Url, timeout: Duration, e: &reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(timeout)
    } else if e.is_connect() {
        ClientError::Connect { addr: url.origin().ascii_serialization(), reason: e.to_string() }
    } else {
        ClientError::Http(e.to_string())
    }
}

/// Join the request path and query onto the base URL.
fn resolve(base_url: &Url, request: &ApiRequest) -> Result<Url, ClientError> {
    let mut url = base_url
        .join(request.path.trim_start_matches('/'))
        .map_err(|e| ClientError::Http(format!("invalid API path {}: {e}", request.path)))?;
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(request.query.iter());
    }
    Ok(url)
}
