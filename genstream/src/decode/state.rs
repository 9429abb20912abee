// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

use crate::frame::{GeneratedFile, ProtocolFrame};

/// How a decoded generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A `done` frame arrived.
    Done { files_generated: usize },
    /// An `error` frame arrived, or the transport ended without a terminal
    /// frame, or the request itself failed.
    Failed(String),
    /// Stopped locally. Not a failure; no frame is expected.
    Cancelled,
}

/// Client-side accumulators for one generation.
///
/// Exactly one decode loop mutates a given state. Once `done`, `error`, or
/// cancellation is recorded the state is frozen and later frames are
/// ignored. Nothing accumulated is ever cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    pub reasoning_text: String,
    pub content_text: String,
    /// Files in arrival order, duplicates included.
    pub files: Vec<GeneratedFile>,
    pub complete: bool,
    /// Count reported by the `done` frame.
    pub files_generated: Option<usize>,
    pub error_message: Option<String>,
    pub cancelled: bool,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_frozen(&self) -> bool {
        self.complete || self.cancelled
    }

    /// Fold one frame in. Returns true when the state is frozen afterwards,
    /// meaning the caller should stop reading.
    pub fn apply(&mut self, frame: &ProtocolFrame) -> bool {
        if self.is_frozen() {
            tracing::debug!(kind = frame.kind(), "ignoring frame after terminal state");
            return true;
        }

        match frame {
            ProtocolFrame::Reasoning { content } => self.reasoning_text.push_str(content),
            ProtocolFrame::Content { content } => self.content_text.push_str(content),
            ProtocolFrame::FileStart { .. } => {}
            ProtocolFrame::FileComplete {
                file_name,
                language,
                content,
                ..
            } => self.files.push(GeneratedFile {
                name: file_name.clone(),
                path: file_name.clone(),
                language: language.clone(),
                content: content.clone(),
            }),
            ProtocolFrame::Done { files_generated } => {
                self.files_generated = Some(*files_generated);
                self.complete = true;
            }
            ProtocolFrame::Error { error } => {
                self.error_message = Some(error.clone());
                self.complete = true;
            }
        }
        self.is_frozen()
    }

    /// Record a failure that did not arrive as a frame.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.is_frozen() {
            return;
        }
        self.error_message = Some(message.into());
        self.complete = true;
    }

    pub fn cancel(&mut self) {
        if !self.complete {
            self.cancelled = true;
        }
    }

    /// The outcome so far, if the state is frozen.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.cancelled {
            return Some(Outcome::Cancelled);
        }
        if let Some(error) = &self.error_message {
            return Some(Outcome::Failed(error.clone()));
        }
        self.files_generated
            .map(|files_generated| Outcome::Done { files_generated })
    }
}
