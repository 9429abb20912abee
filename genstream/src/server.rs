// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// HTTP surface
//
// Responsibilities:
// - POST /api/generate/stream: frame stream over one long-lived response
// - POST /api/generate: same pipeline, files returned as one JSON body
// - OPTIONS preflight and CORS headers on every response
// - GET /health

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::StreamExt;
use serde_json::json;

use crate::config::Config;
use crate::decode::Outcome;
use crate::frame::{event_stream_headers, insert_cors_headers, FrameEncoder};
use crate::generation::{
    collect_generation, run_generation, GenerationOptions, GenerationRequest,
    FRAME_CHANNEL_CAPACITY,
};
use crate::upstream::TextStreamSource;

/// Upper bound on request bodies; attachments arrive inline as base64.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned to HTTP callers as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Prompt is required")]
    MissingPrompt,

    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("{0}")]
    GenerationFailed(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingPrompt | ApiError::MalformedJson(_) | ApiError::BodyRead(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state injected into axum handlers. Holds no per-generation data.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn TextStreamSource>,
    pub options: GenerationOptions,
    pub allow_origin: Arc<str>,
}

impl AppState {
    pub fn new(config: &Config, source: Arc<dyn TextStreamSource>) -> Self {
        Self {
            source,
            options: GenerationOptions::from_config(config),
            allow_origin: Arc::from(config.server.allow_origin.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn read_request(request: Request) -> Result<GenerationRequest, ApiError> {
    let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BodyRead(e.to_string()))?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MissingPrompt);
    }

    let parsed: GenerationRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedJson(e.to_string()))?;
    if parsed.prompt.trim().is_empty() {
        return Err(ApiError::MissingPrompt);
    }
    Ok(parsed)
}

/// POST /api/generate/stream
///
/// Headers go out before the first frame; the pipeline runs on its own task
/// and stops reading upstream once the response body is dropped.
pub async fn generate_stream(State(state): State<AppState>, request: Request) -> Response {
    let request = match read_request(request).await {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };

    let (mut encoder, frames) = FrameEncoder::channel(FRAME_CHANNEL_CAPACITY);
    let source = state.source.clone();
    let options = state.options;
    tokio::spawn(async move {
        run_generation(source.as_ref(), &request, options, &mut encoder).await;
    });

    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));
    (event_stream_headers(&state.allow_origin), body).into_response()
}

/// POST /api/generate
pub async fn generate(State(state): State<AppState>, request: Request) -> Response {
    let request = match read_request(request).await {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };

    let result = collect_generation(state.source.as_ref(), &request, state.options).await;
    match result.outcome() {
        Some(Outcome::Done { .. }) => Json(json!({
            "success": true,
            "filesGenerated": result.files.len(),
            "files": result.files,
        }))
        .into_response(),
        Some(Outcome::Failed(message)) => ApiError::GenerationFailed(message).into_response(),
        Some(Outcome::Cancelled) | None => {
            ApiError::GenerationFailed("generation ended without a result".into()).into_response()
        }
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "source": state.source.name() }))
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn cors(State(state): State<AppState>, mut response: Response) -> Response {
    insert_cors_headers(response.headers_mut(), &state.allow_origin);
    response
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router. The text source is injected; nothing here opens
/// a connection.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate", post(generate).options(preflight))
        .route("/api/generate/stream", post(generate_stream).options(preflight))
        .layer(middleware::map_response_with_state(state.clone(), cors))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierMode, FallbackConfig, ZeroFilePolicy};
    use crate::decode::FrameDecoder;
    use crate::fallback::{FallbackSource, DEMO_FILE_COUNT};
    use crate::frame::ProtocolFrame;
    use crate::upstream::{UpstreamError, UpstreamStream};
    use async_trait::async_trait;
    use axum::http::{header, Request as HttpRequest};
    use tower::ServiceExt; // for oneshot

    struct FailingSource;

    #[async_trait]
    impl TextStreamSource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn open(&self, _request: &GenerationRequest) -> Result<UpstreamStream, UpstreamError> {
            Err(UpstreamError::Model("Overloaded".into()))
        }
    }

    fn state_with(source: Arc<dyn TextStreamSource>) -> AppState {
        AppState {
            source,
            options: GenerationOptions {
                classifier: ClassifierMode::ChunkLocal,
                zero_files: ZeroFilePolicy::Done,
            },
            allow_origin: Arc::from("http://localhost:5173"),
        }
    }

    fn app() -> Router {
        build_router(state_with(Arc::new(FallbackSource::new(FallbackConfig {
            chunk_chars: 80,
            delay_ms: 0,
        }))))
    }

    fn post_json(uri: &str, body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), MAX_BODY_BYTES)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn stream_endpoint_sends_frames_with_event_stream_headers() {
        let resp = app()
            .oneshot(post_json("/api/generate/stream", r#"{"prompt":"demo"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );

        let text = body_string(resp).await;
        let frames = FrameDecoder::new().push(text.as_bytes());
        assert!(matches!(frames.first(), Some(ProtocolFrame::Reasoning { .. })));
        assert_eq!(
            frames.last(),
            Some(&ProtocolFrame::Done {
                files_generated: DEMO_FILE_COUNT
            })
        );
        let files = frames
            .iter()
            .filter(|f| matches!(f, ProtocolFrame::FileComplete { .. }))
            .count();
        assert_eq!(files, DEMO_FILE_COUNT);
    }

    #[tokio::test]
    async fn missing_prompt_returns_400() {
        for body in [r#"{}"#, r#"{"prompt":"   "}"#, ""] {
            let resp = app()
                .oneshot(post_json("/api/generate/stream", body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_string(resp).await, r#"{"error":"Prompt is required"}"#);
        }
    }

    #[tokio::test]
    async fn malformed_json_returns_400() {
        let resp = app()
            .oneshot(post_json("/api/generate", "this is not json {{{"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("not valid JSON"));
    }

    #[tokio::test]
    async fn error_responses_carry_cors_headers() {
        let resp = app()
            .oneshot(post_json("/api/generate", "{}"))
            .await
            .unwrap();
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn non_streaming_endpoint_returns_files() {
        let resp = app()
            .oneshot(post_json("/api/generate", r#"{"prompt":"demo"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["filesGenerated"], DEMO_FILE_COUNT);
        assert_eq!(body["files"][0]["path"], "index.html");
        assert_eq!(body["files"][2]["language"], "javascript");
    }

    #[tokio::test]
    async fn upstream_failure_streams_error_frame() {
        let app = build_router(state_with(Arc::new(FailingSource)));
        let resp = app
            .oneshot(post_json("/api/generate/stream", r#"{"prompt":"demo"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let frames = FrameDecoder::new().push(body_string(resp).await.as_bytes());
        assert_eq!(frames, vec![ProtocolFrame::error("model error: Overloaded")]);
    }

    #[tokio::test]
    async fn upstream_failure_non_streaming_returns_502() {
        let app = build_router(state_with(Arc::new(FailingSource)));
        let resp = app
            .oneshot(post_json("/api/generate", r#"{"prompt":"demo"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_string(resp).await,
            r#"{"error":"model error: Overloaded"}"#
        );
    }

    #[tokio::test]
    async fn preflight_returns_204_with_cors() {
        let req = HttpRequest::builder()
            .method("OPTIONS")
            .uri("/api/generate/stream")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, POST, OPTIONS"
        );
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn health_reports_source() {
        let req = HttpRequest::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, r#"{"source":"fallback","status":"ok"}"#);
    }

    #[tokio::test]
    async fn unknown_path_returns_404() {
        let req = HttpRequest::builder()
            .uri("/v1/messages")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
