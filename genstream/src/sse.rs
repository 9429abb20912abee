// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// SSE line plumbing
//
// Shared by the upstream adapter (reading the model provider's event
// stream) and the protocol decoder (reading our own frame stream):
// - Rolling line buffer fed with raw network reads
// - `data:` / `event:` line parsing

/// Prefix carried by every data line on the wire.
pub const DATA_PREFIX: &str = "data: ";

// ---------------------------------------------------------------------------
// Line buffer
// ---------------------------------------------------------------------------

/// Accumulates raw bytes and yields complete lines.
///
/// Splitting happens on `\n` at the byte level, so a multi-byte UTF-8
/// character that straddles two reads is reassembled before decoding.
/// The final, possibly incomplete, fragment is retained for the next push.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a read and drain every line it completes, without the
    /// terminating `\n` (or `\r\n`).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Take the trailing fragment left after the last newline, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }

    /// Bytes currently held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// One meaningful SSE line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// `event: <name>`
    Event(String),
    /// `data: <payload>`
    Data(String),
}

/// Parse a single SSE line. Blank lines, comments, and unknown fields
/// yield `None`.
pub fn parse_sse_line(line: &str) -> Option<SseLine> {
    let trimmed = line.trim_end();

    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    if let Some(data) = trimmed
        .strip_prefix(DATA_PREFIX)
        .or_else(|| trimmed.strip_prefix("data:"))
    {
        return Some(SseLine::Data(data.to_string()));
    }

    if let Some(event) = trimmed
        .strip_prefix("event: ")
        .or_else(|| trimmed.strip_prefix("event:"))
    {
        return Some(SseLine::Event(event.trim().to_string()));
    }

    None
}
