// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Stream source adapter
//
// Wraps a token-streaming text generator behind one trait. A source yields
// ordered text deltas followed by an optional completion signal; transport
// and model failures surface as `UpstreamError` items.

mod anthropic;
mod http;

pub use anthropic::AnthropicSource;
pub use http::{
    ByteStream, HttpBody, HttpError, HttpRequest, HttpResponse, HttpSender, ReqwestHttpSender,
};

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;

use crate::config::{Config, UpstreamMode};
use crate::fallback::FallbackSource;
use crate::generation::GenerationRequest;

/// One item from an upstream text stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    /// A non-empty text fragment, in generation order.
    Delta(String),
    /// The upstream reported that generation finished.
    Completed,
}

pub type UpstreamStream = Pin<Box<dyn Stream<Item = Result<UpstreamEvent, UpstreamError>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model error: {0}")]
    Model(String),

    #[error("failed to encode upstream request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A generator of incremental text for one prompt.
#[async_trait]
pub trait TextStreamSource: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Start a generation. Each call is an independent subscription.
    async fn open(&self, request: &GenerationRequest) -> Result<UpstreamStream, UpstreamError>;
}

/// Build the source selected by config.
pub fn build_source(config: &Config) -> Arc<dyn TextStreamSource> {
    build_source_with(config, Arc::new(ReqwestHttpSender::default()))
}

pub fn build_source_with(config: &Config, http: Arc<dyn HttpSender>) -> Arc<dyn TextStreamSource> {
    match (config.upstream.mode, config.upstream.api_key.clone()) {
        (UpstreamMode::Anthropic, Some(api_key)) => {
            Arc::new(AnthropicSource::new(http, &config.upstream, api_key))
        }
        _ => Arc::new(FallbackSource::new(config.fallback)),
    }
}
