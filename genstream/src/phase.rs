// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Phase classifiers
//
// Label each upstream delta as reasoning or content, based on the
// `<reasoning>` / `</reasoning>` markers the model emits inline.
//
// Two implementations:
// - ChunkLocalClassifier: one event per delta, label from the state before
//   the delta, markers detected only when whole inside a single delta.
// - LookbackClassifier: holds back a possible partial marker until it is
//   confirmed or ruled out, and splits deltas at marker boundaries.

use crate::config::ClassifierMode;
use crate::frame::{DeltaEvent, Phase};

pub const OPEN_TAG: &str = "<reasoning>";
pub const CLOSE_TAG: &str = "</reasoning>";

// ---------------------------------------------------------------------------
// Trait: PhaseClassifier
// ---------------------------------------------------------------------------

/// Request-scoped classifier state. One instance per generation.
pub trait PhaseClassifier: Send {
    /// Classify an incoming delta. Empty deltas yield nothing.
    fn push(&mut self, text: &str) -> Vec<DeltaEvent>;

    /// Release anything still held back at end of stream.
    fn finish(&mut self) -> Vec<DeltaEvent>;

    /// Whether the classifier currently believes it is inside a reasoning
    /// section.
    fn in_reasoning(&self) -> bool;
}

pub fn new_classifier(mode: ClassifierMode) -> Box<dyn PhaseClassifier> {
    match mode {
        ClassifierMode::ChunkLocal => Box::new(ChunkLocalClassifier::new()),
        ClassifierMode::Lookback => Box::new(LookbackClassifier::new()),
    }
}

/// Classify one delta given the state before it.
///
/// Returns the delta's phase and the state after it. A delta that carries
/// either marker is reasoning. Unmatched or absent markers leave the state
/// unchanged.
pub fn classify_delta(in_reasoning: bool, text: &str) -> (Phase, bool) {
    let opens = text.contains(OPEN_TAG);
    let closes = text.contains(CLOSE_TAG);

    let mut next = in_reasoning;
    if opens {
        next = true;
    }
    if closes {
        next = false;
    }

    let phase = if in_reasoning || opens || closes {
        Phase::Reasoning
    } else {
        Phase::Content
    };
    (phase, next)
}

/// The content-phase text of a complete output, split by marker position.
///
/// Independent of how the output was chunked into deltas. An unterminated
/// `<reasoning>` section runs to the end of the text.
pub fn content_text(output: &str) -> String {
    let mut classifier = LookbackClassifier::new();
    let mut events = classifier.push(output);
    events.extend(classifier.finish());
    events
        .into_iter()
        .filter(|e| e.phase == Phase::Content)
        .map(|e| e.text)
        .collect()
}

// ---------------------------------------------------------------------------
// Chunk-local classifier
// ---------------------------------------------------------------------------

/// Classifies each delta independently with no lookback.
///
/// A marker split across two deltas (`"<reas"` + `"oning>"`) is not seen.
#[derive(Debug, Default)]
pub struct ChunkLocalClassifier {
    in_reasoning: bool,
    offset: usize,
}

impl ChunkLocalClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PhaseClassifier for ChunkLocalClassifier {
    fn push(&mut self, text: &str) -> Vec<DeltaEvent> {
        if text.is_empty() {
            return Vec::new();
        }
        let (phase, next) = classify_delta(self.in_reasoning, text);
        if next != self.in_reasoning {
            tracing::debug!(in_reasoning = next, offset = self.offset, "reasoning state changed");
        }
        self.in_reasoning = next;

        let event = DeltaEvent {
            offset: self.offset,
            text: text.to_string(),
            phase,
        };
        self.offset += text.len();
        vec![event]
    }

    fn finish(&mut self) -> Vec<DeltaEvent> {
        Vec::new()
    }

    fn in_reasoning(&self) -> bool {
        self.in_reasoning
    }
}

// ---------------------------------------------------------------------------
// Lookback classifier
// ---------------------------------------------------------------------------

/// Buffers the shortest possible tail so markers split across deltas are
/// still recognised.
///
/// Held-back text is at most `CLOSE_TAG.len() - 1` bytes. Released text is
/// split at marker boundaries: text before `<reasoning>` is content, the
/// markers and everything between them is reasoning, text after
/// `</reasoning>` is content.
#[derive(Debug, Default)]
pub struct LookbackClassifier {
    in_reasoning: bool,
    /// Stream offset of the first byte of `pending`.
    offset: usize,
    pending: String,
}

impl LookbackClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of the longest suffix of `pending` that is a proper prefix of
    /// either marker.
    fn held_back_len(&self) -> usize {
        let max = (CLOSE_TAG.len() - 1).min(self.pending.len());
        for k in (1..=max).rev() {
            let start = self.pending.len() - k;
            if !self.pending.is_char_boundary(start) {
                continue;
            }
            let suffix = &self.pending[start..];
            let partial_open = k < OPEN_TAG.len() && OPEN_TAG.starts_with(suffix);
            let partial_close = k < CLOSE_TAG.len() && CLOSE_TAG.starts_with(suffix);
            if partial_open || partial_close {
                return k;
            }
        }
        0
    }

    fn release(&mut self, len: usize) -> Vec<DeltaEvent> {
        let released: String = self.pending.drain(..len).collect();
        let mut segments: Vec<DeltaEvent> = Vec::new();
        let mut cursor = 0;

        while cursor < released.len() {
            let rest = &released[cursor..];
            let (phase, seg_len) = if self.in_reasoning {
                match rest.find(CLOSE_TAG) {
                    Some(pos) => {
                        self.in_reasoning = false;
                        (Phase::Reasoning, pos + CLOSE_TAG.len())
                    }
                    None => (Phase::Reasoning, rest.len()),
                }
            } else {
                match rest.find(OPEN_TAG) {
                    Some(0) => {
                        self.in_reasoning = true;
                        continue;
                    }
                    Some(pos) => (Phase::Content, pos),
                    None => (Phase::Content, rest.len()),
                }
            };

            let text = &rest[..seg_len];
            let offset = self.offset + cursor;
            match segments.last_mut() {
                Some(last) if last.phase == phase => last.text.push_str(text),
                _ => segments.push(DeltaEvent {
                    offset,
                    text: text.to_string(),
                    phase,
                }),
            }
            cursor += seg_len;
        }

        self.offset += released.len();
        segments
    }
}

impl PhaseClassifier for LookbackClassifier {
    fn push(&mut self, text: &str) -> Vec<DeltaEvent> {
        self.pending.push_str(text);
        let releasable = self.pending.len() - self.held_back_len();
        self.release(releasable)
    }

    fn finish(&mut self) -> Vec<DeltaEvent> {
        let len = self.pending.len();
        self.release(len)
    }

    fn in_reasoning(&self) -> bool {
        self.in_reasoning
    }
}
