// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Protocol frames
//
// Core types shared by the server pipeline and the client decoder:
// classified deltas, the closed frame union, and extracted artifacts.
// Wire form is one JSON object per frame: `data: <json>\n\n`.

mod encoder;

pub use encoder::{event_stream_headers, EncodeError, FrameEncoder};
pub(crate) use encoder::insert_cors_headers;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::sse::DATA_PREFIX;

// ---------------------------------------------------------------------------
// Deltas
// ---------------------------------------------------------------------------

/// Which section of the model output a delta belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Reasoning,
    Content,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Reasoning => "reasoning",
            Phase::Content => "content",
        }
    }
}

/// A classified fragment of generated text. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaEvent {
    /// Byte offset of `text` within the full upstream output.
    pub offset: usize,
    pub text: String,
    pub phase: Phase,
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// A named file extracted from the content buffer.
///
/// `content` is never empty; `name` and `path` are identical for extracted
/// blocks and synthesized as `file<N>.<ext>` when the block names none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub name: String,
    pub path: String,
    pub language: String,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// One self-contained unit of the server-to-client wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolFrame {
    Reasoning {
        content: String,
    },
    Content {
        content: String,
    },
    FileStart {
        #[serde(rename = "fileIndex")]
        file_index: usize,
    },
    FileComplete {
        #[serde(rename = "fileName")]
        file_name: String,
        language: String,
        content: String,
        #[serde(rename = "fileIndex")]
        file_index: usize,
    },
    Done {
        #[serde(rename = "filesGenerated")]
        files_generated: usize,
    },
    Error {
        error: String,
    },
}

impl ProtocolFrame {
    /// The reasoning/content frame carrying a classified delta.
    pub fn for_delta(delta: &DeltaEvent) -> Self {
        match delta.phase {
            Phase::Reasoning => ProtocolFrame::Reasoning {
                content: delta.text.clone(),
            },
            Phase::Content => ProtocolFrame::Content {
                content: delta.text.clone(),
            },
        }
    }

    /// `fileName` carries the file's path so the client can place it.
    pub fn file_complete(file: &GeneratedFile, file_index: usize) -> Self {
        ProtocolFrame::FileComplete {
            file_name: file.path.clone(),
            language: file.language.clone(),
            content: file.content.clone(),
            file_index,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProtocolFrame::Error {
            error: message.into(),
        }
    }

    /// `done` and `error` end a generation; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProtocolFrame::Done { .. } | ProtocolFrame::Error { .. })
    }

    /// Value of the `type` discriminator, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolFrame::Reasoning { .. } => "reasoning",
            ProtocolFrame::Content { .. } => "content",
            ProtocolFrame::FileStart { .. } => "file_start",
            ProtocolFrame::FileComplete { .. } => "file_complete",
            ProtocolFrame::Done { .. } => "done",
            ProtocolFrame::Error { .. } => "error",
        }
    }

    /// Serialize to the wire form `data: <json>\n\n`.
    pub fn to_sse(&self) -> Result<Bytes, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(Bytes::from(format!("{DATA_PREFIX}{json}\n\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(frame: &ProtocolFrame) -> String {
        String::from_utf8(frame.to_sse().unwrap().to_vec()).unwrap()
    }

    #[test]
    fn reasoning_and_content_wire_shape() {
        assert_eq!(
            wire(&ProtocolFrame::Reasoning {
                content: "plan".into()
            }),
            "data: {\"type\":\"reasoning\",\"content\":\"plan\"}\n\n"
        );
        assert_eq!(
            wire(&ProtocolFrame::Content {
                content: "x".into()
            }),
            "data: {\"type\":\"content\",\"content\":\"x\"}\n\n"
        );
    }

    #[test]
    fn file_complete_uses_camel_case_fields() {
        let file = GeneratedFile {
            name: "src/App.tsx".into(),
            path: "src/App.tsx".into(),
            language: "typescript".into(),
            content: "export {}".into(),
        };
        assert_eq!(
            wire(&ProtocolFrame::file_complete(&file, 0)),
            "data: {\"type\":\"file_complete\",\"fileName\":\"src/App.tsx\",\
             \"language\":\"typescript\",\"content\":\"export {}\",\"fileIndex\":0}\n\n"
        );
    }

    #[test]
    fn terminal_frames_wire_shape() {
        assert_eq!(
            wire(&ProtocolFrame::Done { files_generated: 3 }),
            "data: {\"type\":\"done\",\"filesGenerated\":3}\n\n"
        );
        assert_eq!(
            wire(&ProtocolFrame::error("message")),
            "data: {\"type\":\"error\",\"error\":\"message\"}\n\n"
        );
    }

    #[test]
    fn only_done_and_error_are_terminal() {
        assert!(ProtocolFrame::Done { files_generated: 0 }.is_terminal());
        assert!(ProtocolFrame::error("x").is_terminal());
        assert!(!ProtocolFrame::FileStart { file_index: 0 }.is_terminal());
        assert!(!ProtocolFrame::Content { content: String::new() }.is_terminal());
    }

    #[test]
    fn delta_phase_selects_frame_variant() {
        let delta = DeltaEvent {
            offset: 4,
            text: "hi".into(),
            phase: Phase::Reasoning,
        };
        assert_eq!(
            ProtocolFrame::for_delta(&delta),
            ProtocolFrame::Reasoning {
                content: "hi".into()
            }
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_json::from_str::<ProtocolFrame>(r#"{"type":"progress","pct":5}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn file_complete_without_file_name_is_rejected() {
        let parsed = serde_json::from_str::<ProtocolFrame>(
            r#"{"type":"file_complete","language":"css","content":"a{}","fileIndex":0}"#,
        );
        assert!(parsed.is_err());
    }
}
