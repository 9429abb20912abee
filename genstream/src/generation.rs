// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Generation pipeline
//
// One request, one upstream subscription, one frame sequence:
//   source deltas -> classifier -> reasoning/content frames
//   completion    -> extractor  -> file_complete frames -> done
// Every upstream failure becomes exactly one `error` frame here.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ClassifierMode, Config, ZeroFilePolicy};
use crate::decode::{FrameDecoder, StreamState};
use crate::extract::extract;
use crate::frame::{EncodeError, FrameEncoder, GeneratedFile, ProtocolFrame};
use crate::phase::{content_text, new_classifier};
use crate::upstream::{TextStreamSource, UpstreamEvent};

/// Frames buffered between the pipeline and the response body.
pub const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Directory attachments are placed under in the generated project.
pub const ASSET_DIR: &str = "public/assets";

pub const NO_OUTPUT_MESSAGE: &str = "upstream stream ended without output";
pub const NO_FILES_MESSAGE: &str = "no files were generated";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// An uploaded image forwarded to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub mime_type: String,
    pub base64: String,
    /// When present the image is also returned as a generated file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ImageAttachment {
    /// The artifact for a named attachment. Only the final path component of
    /// the name is kept.
    pub fn as_artifact(&self) -> Option<GeneratedFile> {
        let name = self.name.as_deref()?.rsplit(['/', '\\']).next()?.trim();
        if name.is_empty() || self.base64.is_empty() {
            return None;
        }
        Some(GeneratedFile {
            name: name.to_string(),
            path: format!("{ASSET_DIR}/{name}"),
            language: "base64".to_string(),
            content: self.base64.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub images: Vec<ImageAttachment>,
}

/// Per-generation behaviour drawn from config.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationOptions {
    pub classifier: ClassifierMode,
    pub zero_files: ZeroFilePolicy,
}

impl GenerationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            classifier: config.classifier,
            zero_files: config.completion.zero_files,
        }
    }
}

/// How a generation ended, from the server's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Done { files_generated: usize },
    Failed(String),
    /// The response body was dropped; upstream reading stopped early.
    ClientGone,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run one generation, writing its frames to `encoder`.
///
/// The encoder carries exactly one terminal frame afterwards, unless the
/// client went away first.
pub async fn run_generation(
    source: &dyn TextStreamSource,
    request: &GenerationRequest,
    options: GenerationOptions,
    encoder: &mut FrameEncoder,
) -> GenerationOutcome {
    let request_id = Uuid::new_v4().to_string();
    tracing::info!(
        request_id = %request_id,
        source = source.name(),
        prompt_chars = request.prompt.chars().count(),
        images = request.images.len(),
        classifier = ?options.classifier,
        "generation started"
    );

    let outcome = match pipeline(source, request, options, encoder, &request_id).await {
        Ok(outcome) => outcome,
        Err(EncodeError::ClientGone) => GenerationOutcome::ClientGone,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "frame encoding failed");
            GenerationOutcome::Failed(e.to_string())
        }
    };

    match &outcome {
        GenerationOutcome::Done { files_generated } => tracing::info!(
            request_id = %request_id,
            files_generated,
            frames = encoder.frames_sent(),
            "generation complete"
        ),
        GenerationOutcome::Failed(error) => tracing::warn!(
            request_id = %request_id,
            error = %error,
            "generation failed"
        ),
        GenerationOutcome::ClientGone => tracing::info!(
            request_id = %request_id,
            "client disconnected; generation abandoned"
        ),
    }
    outcome
}

async fn pipeline(
    source: &dyn TextStreamSource,
    request: &GenerationRequest,
    options: GenerationOptions,
    encoder: &mut FrameEncoder,
    request_id: &str,
) -> Result<GenerationOutcome, EncodeError> {
    let mut stream = match source.open(request).await {
        Ok(stream) => stream,
        Err(e) => return fail(encoder, e.to_string()).await,
    };

    let mut classifier = new_classifier(options.classifier);
    let mut output = String::new();
    let mut completed = false;

    while let Some(item) = stream.next().await {
        match item {
            Ok(UpstreamEvent::Delta(text)) => {
                for event in classifier.push(&text) {
                    encoder.emit(&ProtocolFrame::for_delta(&event)).await?;
                }
                output.push_str(&text);
            }
            Ok(UpstreamEvent::Completed) => {
                completed = true;
                break;
            }
            Err(e) => return fail(encoder, e.to_string()).await,
        }
    }
    drop(stream);

    for event in classifier.finish() {
        encoder.emit(&ProtocolFrame::for_delta(&event)).await?;
    }

    if !completed {
        if output.is_empty() {
            return fail(encoder, NO_OUTPUT_MESSAGE.to_string()).await;
        }
        tracing::warn!(
            request_id = %request_id,
            bytes = output.len(),
            "upstream ended without completion signal; extracting anyway"
        );
    }

    // Frame labels depend on delta boundaries; the file list must not.
    let content = content_text(&output);
    let mut files = extract(&content);
    tracing::debug!(
        request_id = %request_id,
        content_bytes = content.len(),
        extracted = files.len(),
        "content extracted"
    );
    files.extend(request.images.iter().filter_map(ImageAttachment::as_artifact));

    if files.is_empty() && options.zero_files == ZeroFilePolicy::Error {
        return fail(encoder, NO_FILES_MESSAGE.to_string()).await;
    }

    for (index, file) in files.iter().enumerate() {
        tracing::debug!(
            request_id = %request_id,
            file_index = index,
            name = %file.name,
            bytes = file.content.len(),
            "emitting file"
        );
        encoder.emit(&ProtocolFrame::file_complete(file, index)).await?;
    }
    encoder
        .emit(&ProtocolFrame::Done {
            files_generated: files.len(),
        })
        .await?;

    Ok(GenerationOutcome::Done {
        files_generated: files.len(),
    })
}

async fn fail(
    encoder: &mut FrameEncoder,
    message: String,
) -> Result<GenerationOutcome, EncodeError> {
    encoder.emit(&ProtocolFrame::error(message.clone())).await?;
    Ok(GenerationOutcome::Failed(message))
}

/// Run a generation to completion and fold its frames, decoded from the
/// wire form, into a `StreamState`.
pub async fn collect_generation(
    source: &dyn TextStreamSource,
    request: &GenerationRequest,
    options: GenerationOptions,
) -> StreamState {
    let (mut encoder, mut body) = FrameEncoder::channel(FRAME_CHANNEL_CAPACITY);

    let producer = async move {
        run_generation(source, request, options, &mut encoder).await;
    };
    let consumer = async {
        let mut decoder = FrameDecoder::new();
        let mut state = StreamState::default();
        while let Some(chunk) = body.next().await {
            for frame in decoder.push(&chunk) {
                state.apply(&frame);
            }
        }
        state
    };

    let ((), state) = tokio::join!(producer, consumer);
    state
}
