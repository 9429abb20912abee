// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Anthropic Messages streaming adapter
//
// Request: one user turn carrying the prompt plus base64 image blocks.
// Response: SSE events, of which only text deltas, `message_stop` and
// `error` matter here.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;

use crate::config::UpstreamConfig;
use crate::generation::GenerationRequest;
use crate::sse::{parse_sse_line, LineBuffer, SseLine};

use super::http::{ByteStream, HttpRequest, HttpSender};
use super::{TextStreamSource, UpstreamError, UpstreamEvent, UpstreamStream};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicSource {
    http: Arc<dyn HttpSender>,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    timeout_ms: Option<u64>,
    system_prompt: String,
}

impl AnthropicSource {
    pub fn new(http: Arc<dyn HttpSender>, config: &UpstreamConfig, api_key: String) -> Self {
        Self {
            http,
            endpoint: format!("{}/v1/messages", config.base_url),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout_ms: config.timeout_ms,
            system_prompt: config.system_prompt.clone(),
        }
    }

    fn request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut content = vec![json!({ "type": "text", "text": request.prompt })];
        content.extend(request.images.iter().map(|image| {
            json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.mime_type,
                    "data": image.base64,
                },
            })
        }));

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": self.system_prompt,
            "stream": true,
            "messages": [{ "role": "user", "content": content }],
        })
    }

    fn headers(&self) -> Result<HeaderMap, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| UpstreamError::Model("API key is not a valid header value".into()))?;
        headers.insert("x-api-key", key);
        Ok(headers)
    }
}

#[async_trait]
impl TextStreamSource for AnthropicSource {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn open(&self, request: &GenerationRequest) -> Result<UpstreamStream, UpstreamError> {
        let body = serde_json::to_vec(&self.request_body(request))?;
        tracing::debug!(
            model = %self.model,
            images = request.images.len(),
            bytes = body.len(),
            "opening upstream stream"
        );

        let response = self
            .http
            .send(HttpRequest {
                method: Method::POST,
                url: self.endpoint.clone(),
                headers: self.headers()?,
                body: Bytes::from(body),
                timeout_ms: self.timeout_ms,
            })
            .await?;

        if !response.status.is_success() {
            let status = response.status.as_u16();
            let raw = response.body.collect().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status,
                body: error_message(&raw),
            });
        }

        Ok(event_stream(response.body.into_stream()))
    }
}

// ---------------------------------------------------------------------------
// Event decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: BlockDelta },
    MessageStop,
    Error { error: ErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Prefer the provider's `error.message`; otherwise the raw body.
fn error_message(raw: &[u8]) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: ErrorBody,
    }
    match serde_json::from_slice::<Envelope>(raw) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => String::from_utf8_lossy(raw).trim().to_string(),
    }
}

struct DecodeState {
    body: ByteStream,
    lines: LineBuffer,
    ready: VecDeque<Result<UpstreamEvent, UpstreamError>>,
    finished: bool,
}

impl DecodeState {
    fn ingest(&mut self, line: &str) {
        let payload = match parse_sse_line(line) {
            Some(SseLine::Data(payload)) => payload,
            _ => return,
        };
        if payload.is_empty() || payload == "[DONE]" {
            return;
        }

        match serde_json::from_str::<StreamEvent>(&payload) {
            Ok(StreamEvent::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
            }) if !text.is_empty() => self.ready.push_back(Ok(UpstreamEvent::Delta(text))),
            Ok(StreamEvent::MessageStop) => {
                self.ready.push_back(Ok(UpstreamEvent::Completed));
                self.finished = true;
            }
            Ok(StreamEvent::Error { error }) => {
                self.ready.push_back(Err(UpstreamError::Model(error.message)));
                self.finished = true;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, bytes = payload.len(), "skipping malformed upstream event");
            }
        }
    }
}

/// Turn the provider's SSE byte stream into upstream events. The stream
/// ends after `message_stop`, an `error` event, or a transport failure.
fn event_stream(body: ByteStream) -> UpstreamStream {
    let state = DecodeState {
        body,
        lines: LineBuffer::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for line in state.lines.push(&chunk) {
                        if state.finished {
                            break;
                        }
                        state.ingest(&line);
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.ready.push_back(Err(e.into()));
                }
                None => {
                    state.finished = true;
                    if let Some(line) = state.lines.finish() {
                        state.ingest(&line);
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::generation::ImageAttachment;
    use crate::upstream::{HttpBody, HttpError, HttpResponse};
    use axum::http::StatusCode;
    use std::sync::Mutex;

    /// Replays canned chunks and records the request it was given.
    struct CannedSender {
        status: StatusCode,
        chunks: Vec<&'static str>,
        seen: Mutex<Option<HttpRequest>>,
    }

    impl CannedSender {
        fn ok(chunks: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                status: StatusCode::OK,
                chunks,
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl HttpSender for CannedSender {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            *self.seen.lock().unwrap() = Some(request);
            let items: Vec<Result<Bytes, HttpError>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                .collect();
            Ok(HttpResponse {
                status: self.status,
                headers: HeaderMap::new(),
                body: HttpBody::Stream(Box::pin(futures_util::stream::iter(items))),
            })
        }
    }

    fn source(http: Arc<CannedSender>) -> AnthropicSource {
        AnthropicSource::new(http, &UpstreamConfig::default(), "sk-test".into())
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "Build a landing page".into(),
            images: vec![ImageAttachment {
                mime_type: "image/png".into(),
                base64: "iVBORw0KGgo=".into(),
                name: Some("hero.png".into()),
            }],
        }
    }

    async fn collect(stream: UpstreamStream) -> Vec<Result<UpstreamEvent, UpstreamError>> {
        stream.collect().await
    }

    const DELTA_HELLO: &str = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n";
    const STOP: &str = "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n";

    #[tokio::test]
    async fn text_deltas_then_completion() {
        let http = CannedSender::ok(vec![
            "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{}}\n\n",
            DELTA_HELLO,
            "event: ping\ndata: {\"type\":\"ping\"}\n\n",
            STOP,
        ]);
        let events = collect(source(http).open(&request()).await.unwrap()).await;
        let events: Vec<_> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![UpstreamEvent::Delta("Hello".into()), UpstreamEvent::Completed]
        );
    }

    #[tokio::test]
    async fn event_split_across_reads() {
        let http = CannedSender::ok(vec![
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_",
            "delta\",\"text\":\"split\"}}\n",
            "\ndata: {\"type\":\"message_stop\"}\n\n",
        ]);
        let events = collect(source(http).open(&request()).await.unwrap()).await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &UpstreamEvent::Delta("split".into())
        );
    }

    #[tokio::test]
    async fn stream_without_stop_just_ends() {
        let http = CannedSender::ok(vec![DELTA_HELLO]);
        let events = collect(source(http).open(&request()).await.unwrap()).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(UpstreamEvent::Delta(_))));
    }

    #[tokio::test]
    async fn error_event_ends_stream() {
        let http = CannedSender::ok(vec![
            DELTA_HELLO,
            "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
            DELTA_HELLO,
        ]);
        let events = collect(source(http).open(&request()).await.unwrap()).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], Err(UpstreamError::Model(m)) if m == "Overloaded"));
    }

    #[tokio::test]
    async fn malformed_event_skipped() {
        let http = CannedSender::ok(vec!["data: {not json\n\n", DELTA_HELLO, STOP]);
        let events = collect(source(http).open(&request()).await.unwrap()).await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let http = Arc::new(CannedSender {
            status: StatusCode::UNAUTHORIZED,
            chunks: vec!["{\"type\":\"error\",\"error\":{\"type\":\"authentication_error\",\"message\":\"invalid x-api-key\"}}"],
            seen: Mutex::new(None),
        });
        let err = match source(http).open(&request()).await {
            Err(e) => e,
            Ok(_) => panic!("expected status error"),
        };
        assert!(matches!(
            err,
            UpstreamError::Status { status: 401, ref body } if body == "invalid x-api-key"
        ));
    }

    #[tokio::test]
    async fn request_carries_prompt_images_and_headers() {
        let http = CannedSender::ok(vec![STOP]);
        source(http.clone()).open(&request()).await.unwrap();

        let seen = http.seen.lock().unwrap().take().unwrap();
        assert_eq!(seen.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(seen.headers.get("x-api-key").unwrap(), "sk-test");
        assert_eq!(seen.headers.get("anthropic-version").unwrap(), ANTHROPIC_VERSION);

        let body: serde_json::Value = serde_json::from_slice(&seen.body).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 16000);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["text"], "Build a landing page");
        assert_eq!(content[1]["type"], "image");
        assert_eq!(content[1]["source"]["media_type"], "image/png");
        assert_eq!(content[1]["source"]["data"], "iVBORw0KGgo=");
    }
}
