// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

use axum::http::{header, HeaderMap, HeaderValue};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::ProtocolFrame;

/// Errors raised while writing frames to the outbound stream.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("client disconnected")]
    ClientGone,

    #[error("generation already terminated; dropped {kind} frame")]
    Terminated { kind: &'static str },

    #[error("failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes protocol frames to the outbound byte stream.
///
/// Every frame is sent as its own chunk the moment `emit` is called, in
/// call order. After a `done` or `error` frame the encoder refuses further
/// frames, so a generation carries exactly one terminal frame.
pub struct FrameEncoder {
    tx: mpsc::Sender<Bytes>,
    terminated: bool,
    frames_sent: usize,
}

impl FrameEncoder {
    /// Create an encoder plus the byte stream that feeds the HTTP response.
    pub fn channel(capacity: usize) -> (Self, ReceiverStream<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), ReceiverStream::new(rx))
    }

    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            tx,
            terminated: false,
            frames_sent: 0,
        }
    }

    pub async fn emit(&mut self, frame: &ProtocolFrame) -> Result<(), EncodeError> {
        if self.terminated {
            return Err(EncodeError::Terminated { kind: frame.kind() });
        }
        let bytes = frame.to_sse()?;
        if frame.is_terminal() {
            self.terminated = true;
        }
        self.tx.send(bytes).await.map_err(|_| EncodeError::ClientGone)?;
        self.frames_sent += 1;
        Ok(())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn frames_sent(&self) -> usize {
        self.frames_sent
    }
}

/// Response headers for a frame stream, set once before the first frame.
///
/// The consumer may live on a different origin, so the CORS headers are
/// always present.
pub fn event_stream_headers(allow_origin: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    insert_cors_headers(&mut headers, allow_origin);
    headers
}

pub(crate) fn insert_cors_headers(headers: &mut HeaderMap, allow_origin: &str) {
    let origin =
        HeaderValue::from_str(allow_origin).unwrap_or_else(|_| HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn frames_arrive_in_call_order_as_separate_chunks() {
        let (mut encoder, mut rx) = FrameEncoder::channel(8);

        encoder
            .emit(&ProtocolFrame::Reasoning { content: "a".into() })
            .await
            .unwrap();
        encoder
            .emit(&ProtocolFrame::Content { content: "b".into() })
            .await
            .unwrap();
        encoder
            .emit(&ProtocolFrame::Done { files_generated: 0 })
            .await
            .unwrap();
        drop(encoder);

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.next().await {
            chunks.push(String::from_utf8(chunk.to_vec()).unwrap());
        }
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].contains("\"reasoning\""));
        assert!(chunks[1].contains("\"content\""));
        assert!(chunks[2].contains("\"done\""));
    }

    #[tokio::test]
    async fn nothing_after_terminal_frame() {
        let (mut encoder, _rx) = FrameEncoder::channel(8);
        encoder.emit(&ProtocolFrame::error("boom")).await.unwrap();
        assert!(encoder.is_terminated());

        let err = encoder
            .emit(&ProtocolFrame::Done { files_generated: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, EncodeError::Terminated { kind: "done" }));
        assert_eq!(encoder.frames_sent(), 1);
    }

    #[tokio::test]
    async fn dropped_receiver_reports_client_gone() {
        let (mut encoder, rx) = FrameEncoder::channel(1);
        drop(rx);
        let err = encoder
            .emit(&ProtocolFrame::Content { content: "x".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, EncodeError::ClientGone));
    }

    #[test]
    fn stream_headers_include_cors() {
        let headers = event_stream_headers("https://app.example");
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/event-stream");
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(headers.get(header::CONNECTION).unwrap(), "keep-alive");
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example"
        );
    }
}
