// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Transport seam
//
// Upstream adapters build an `HttpRequest` and hand it to an `HttpSender`.
// Production uses reqwest; tests substitute canned responses.

use std::pin::Pin;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Sends HTTP requests to the model provider.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub timeout_ms: Option<u64>,
}

pub enum HttpBody {
    Full(Bytes),
    Stream(ByteStream),
}

impl HttpBody {
    /// Read the whole body. Used for error responses, which are small.
    pub async fn collect(self) -> Result<Bytes, HttpError> {
        match self {
            HttpBody::Full(bytes) => Ok(bytes),
            HttpBody::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }

    pub fn into_stream(self) -> ByteStream {
        match self {
            HttpBody::Full(bytes) => Box::pin(futures_util::stream::once(async move { Ok(bytes) })),
            HttpBody::Stream(stream) => stream,
        }
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: HttpBody,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream request timed out: {0}")]
    Timeout(String),
}

impl HttpError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout(e.to_string())
        } else {
            HttpError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------

pub struct ReqwestHttpSender {
    client: reqwest::Client,
}

impl ReqwestHttpSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpSender {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl HttpSender for ReqwestHttpSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut req = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body);

        if let Some(timeout_ms) = request.timeout_ms {
            req = req.timeout(std::time::Duration::from_millis(timeout_ms));
        }

        let resp = req.send().await.map_err(HttpError::from_reqwest)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let stream = resp.bytes_stream().map_err(HttpError::from_reqwest);

        Ok(HttpResponse {
            status,
            headers,
            body: HttpBody::Stream(Box::pin(stream)),
        })
    }
}
