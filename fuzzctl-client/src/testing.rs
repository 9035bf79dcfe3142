//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};

use crate::request::{ApiRequest, HttpResponse};
use crate::transport::Transport;
use crate::ClientError;

/// Replays canned responses in order and records every request it was sent.
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, ClientError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: Vec<HttpResponse>) -> Self {
        Self::from_results(replies.into_iter().map(Ok).collect())
    }

    pub(crate) fn from_results(replies: Vec<Result<HttpResponse, ClientError>>) -> Self {
        Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()) }
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<HttpResponse, ClientError> {
        self.requests.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(request);
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Http("no scripted reply left".to_owned())))
    }
}

pub(crate) fn reply(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status: StatusCode::from_u16(status).unwrap_or(StatusCode::IM_A_TEAPOT),
        headers: HeaderMap::new(),
        body: Bytes::copy_from_slice(body.as_bytes()),
    }
}

pub(crate) fn reply_with_header(
    status: u16,
    body: &str,
    name: &'static str,
    value: &'static str,
) -> HttpResponse {
    let mut response = reply(status, body);
    response.headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    response
}
