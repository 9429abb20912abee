// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

use tokio_util::sync::CancellationToken;

use crate::frame::ProtocolFrame;
use crate::generation::GenerationRequest;

use super::{drive, Outcome, StreamState};

/// Path of the streaming generation endpoint.
pub const STREAM_PATH: &str = "/api/generate/stream";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server URL \"{0}\"")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Streams generations from a genstream server.
///
/// One call is one in-flight request with its own cancellation token;
/// nothing is retried.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GenerationClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let base = base_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http,
            endpoint: format!("{base}{STREAM_PATH}"),
        })
    }

    /// POST `request` and fold the response frames into `state`.
    ///
    /// A non-success status fails the generation with
    /// `HTTP error! status: N`. Cancelling before the response arrives or
    /// while it streams yields `Outcome::Cancelled`.
    pub async fn generate<F>(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        state: &mut StreamState,
        observer: F,
    ) -> Result<Outcome, ClientError>
    where
        F: FnMut(&ProtocolFrame, &StreamState),
    {
        let send = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                state.cancel();
                return Ok(Outcome::Cancelled);
            }
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let message = format!("HTTP error! status: {}", status.as_u16());
            tracing::warn!(status = status.as_u16(), "generation request rejected");
            state.fail(message.clone());
            return Ok(Outcome::Failed(message));
        }

        Ok(drive(Box::pin(response.bytes_stream()), cancel, state, observer).await)
    }
}
