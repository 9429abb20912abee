// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Protocol decoder
//
// Client-side mirror of the frame encoder:
// - FrameDecoder: raw reads -> frames, tolerant of frames split across reads
// - StreamState: accumulators folded frame by frame
// - drive(): the read loop, stoppable through a CancellationToken
// - GenerationClient: POSTs a request and drives the response body

mod client;
mod state;

pub use client::{ClientError, GenerationClient};
pub use state::{Outcome, StreamState};

use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::frame::ProtocolFrame;
use crate::sse::{parse_sse_line, LineBuffer, SseLine};

pub const CLOSED_WITHOUT_TERMINAL: &str = "stream closed without a terminal frame";

// ---------------------------------------------------------------------------
// FrameDecoder
// ---------------------------------------------------------------------------

/// Reconstructs frames from raw response-body reads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    lines: LineBuffer,
    malformed: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read; returns every frame completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ProtocolFrame> {
        self.lines
            .push(chunk)
            .iter()
            .filter_map(|line| self.decode_line(line))
            .collect()
    }

    /// Decode a final line left without a trailing newline.
    pub fn finish(&mut self) -> Vec<ProtocolFrame> {
        self.lines
            .finish()
            .and_then(|line| self.decode_line(&line))
            .into_iter()
            .collect()
    }

    /// Lines skipped because they did not parse as a frame.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    fn decode_line(&mut self, line: &str) -> Option<ProtocolFrame> {
        let payload = match parse_sse_line(line)? {
            SseLine::Data(payload) => payload,
            SseLine::Event(_) => return None,
        };

        let frame = match serde_json::from_str::<ProtocolFrame>(&payload) {
            Ok(frame) => frame,
            Err(e) => {
                self.malformed += 1;
                tracing::warn!(error = %e, bytes = payload.len(), "skipping malformed frame");
                return None;
            }
        };

        if let ProtocolFrame::FileComplete { file_name, .. } = &frame {
            if file_name.trim().is_empty() {
                self.malformed += 1;
                tracing::warn!("skipping file_complete frame without a file name");
                return None;
            }
        }
        Some(frame)
    }
}

// ---------------------------------------------------------------------------
// Read loop
// ---------------------------------------------------------------------------

/// Read `body` to its end, folding frames into `state`.
///
/// `observer` sees each frame after it is applied. The loop returns as soon
/// as a terminal frame arrives, the transport ends, or `cancel` fires; the
/// body is dropped on return, closing the connection. State is never
/// rolled back.
pub async fn drive<S, E, F>(
    body: S,
    cancel: &CancellationToken,
    state: &mut StreamState,
    mut observer: F,
) -> Outcome
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
    F: FnMut(&ProtocolFrame, &StreamState),
{
    let mut body = body;
    let mut decoder = FrameDecoder::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                state.cancel();
                tracing::debug!("decode loop cancelled");
                return Outcome::Cancelled;
            }
            next = body.next() => next,
        };

        let frames = match next {
            Some(Ok(chunk)) => decoder.push(&chunk),
            Some(Err(e)) => {
                state.fail(format!("stream read failed: {e}"));
                return terminal(state);
            }
            None => {
                let frames = decoder.finish();
                if !apply_all(frames, state, &mut observer) {
                    state.fail(CLOSED_WITHOUT_TERMINAL);
                }
                return terminal(state);
            }
        };

        if apply_all(frames, state, &mut observer) {
            return terminal(state);
        }
    }
}

/// Apply frames in order; true once the state is frozen.
fn apply_all<F>(frames: Vec<ProtocolFrame>, state: &mut StreamState, observer: &mut F) -> bool
where
    F: FnMut(&ProtocolFrame, &StreamState),
{
    for frame in frames {
        let frozen = state.apply(&frame);
        observer(&frame, state);
        if frozen {
            return true;
        }
    }
    false
}

fn terminal(state: &StreamState) -> Outcome {
    state
        .outcome()
        .unwrap_or_else(|| Outcome::Failed(CLOSED_WITHOUT_TERMINAL.to_string()))
}
