// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Fence tokenizer
//
// Line-oriented state machine over the content buffer:
//   SeekingFence -> ReadingHeader -> ReadingBody -> SeekingFence
//
// A fence is a line whose first non-blank characters are three backticks.
// The rest of the opening fence line is the header. A body runs until the
// next fence line, a body line ending in three backticks, or the end of
// input, so output cut off mid-file still produces an artifact.

use crate::frame::GeneratedFile;

use super::languages::{extension_for_language, language_for_path, DEFAULT_LANGUAGE};

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
struct FenceHeader {
    language: String,
    path: Option<String>,
}

impl FenceHeader {
    /// Parse `<language-token> <optional-path-token>`. A lone token that
    /// looks like a path is taken as the path.
    fn parse(info: &str) -> Self {
        let mut tokens = info.split_whitespace();
        match tokens.next() {
            None => Self {
                language: DEFAULT_LANGUAGE.to_string(),
                path: None,
            },
            Some(token) if looks_like_path(token) => Self {
                language: language_for_path(token).to_string(),
                path: Some(token.to_string()),
            },
            Some(token) => Self {
                language: token.to_string(),
                path: tokens.next().map(str::to_string),
            },
        }
    }
}

fn looks_like_path(token: &str) -> bool {
    token.contains('/') || token.contains('.')
}

/// Body text before a closing marker that trails the line (`</html>```).
fn inline_close(line: &str) -> Option<&str> {
    line.trim_end().strip_suffix(FENCE)
}

/// The header text of a fence line, or `None` if the line is not a fence.
fn fence_info(line: &str) -> Option<&str> {
    line.trim_start()
        .strip_prefix(FENCE)
        .map(|rest| rest.trim_start_matches('`').trim())
}

#[derive(Debug)]
enum State {
    SeekingFence,
    /// A fence opened at the start of the pending fragment; its header line
    /// has not been terminated yet.
    ReadingHeader,
    ReadingBody { header: FenceHeader, body: String },
}

/// Incremental fenced-block tokenizer.
///
/// Feed text in arbitrary pieces; each `feed` returns the files completed
/// by that piece, `finish` flushes a truncated trailing block. Feeding the
/// same text, however it is split, always yields the same files.
#[derive(Debug)]
pub struct FenceTokenizer {
    state: State,
    pending: String,
    files_emitted: usize,
    blocks_seen: usize,
}

impl Default for FenceTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FenceTokenizer {
    pub fn new() -> Self {
        Self {
            state: State::SeekingFence,
            pending: String::new(),
            files_emitted: 0,
            blocks_seen: 0,
        }
    }

    pub fn feed(&mut self, text: &str) -> Vec<GeneratedFile> {
        self.pending.push_str(text);
        let mut files = Vec::new();

        while let Some(newline) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=newline).collect();
            if let Some(file) = self.process_line(&line[..line.len() - 1]) {
                files.push(file);
            }
        }

        if matches!(self.state, State::SeekingFence) && fence_info(&self.pending).is_some() {
            self.state = State::ReadingHeader;
        }
        files
    }

    pub fn finish(&mut self) -> Vec<GeneratedFile> {
        let mut files = Vec::new();

        let rest = std::mem::take(&mut self.pending);
        if !rest.is_empty() {
            files.extend(self.process_line(&rest));
        }

        if let State::ReadingBody { header, body } =
            std::mem::replace(&mut self.state, State::SeekingFence)
        {
            tracing::debug!(
                language = %header.language,
                bytes = body.len(),
                "closing block truncated at end of input"
            );
            files.extend(self.close_block(header, &body));
        }
        self.state = State::SeekingFence;
        files
    }

    /// Whether the tokenizer is inside an open block (header or body).
    pub fn in_block(&self) -> bool {
        !matches!(self.state, State::SeekingFence)
    }

    /// Number of fenced blocks opened so far, including dropped ones.
    pub fn blocks_seen(&self) -> usize {
        self.blocks_seen
    }

    fn process_line(&mut self, line: &str) -> Option<GeneratedFile> {
        match std::mem::replace(&mut self.state, State::SeekingFence) {
            State::SeekingFence | State::ReadingHeader => {
                if let Some(info) = fence_info(line) {
                    self.open_block(info);
                }
                None
            }
            State::ReadingBody { header, mut body } => match fence_info(line) {
                Some(info) => {
                    let file = self.close_block(header, &body);
                    // A fence with a header inside a body closes the current
                    // block and starts the next one.
                    if !info.is_empty() {
                        self.open_block(info);
                    }
                    file
                }
                None => match inline_close(line) {
                    Some(before) => {
                        body.push_str(before);
                        self.close_block(header, &body)
                    }
                    None => {
                        body.push_str(line);
                        body.push('\n');
                        self.state = State::ReadingBody { header, body };
                        None
                    }
                },
            },
        }
    }

    fn open_block(&mut self, info: &str) {
        self.blocks_seen += 1;
        self.state = State::ReadingBody {
            header: FenceHeader::parse(info),
            body: String::new(),
        };
    }

    fn close_block(&mut self, header: FenceHeader, body: &str) -> Option<GeneratedFile> {
        let content = body.trim();

        let name = match header.path {
            Some(path) => path,
            None => format!(
                "file{}.{}",
                self.files_emitted,
                extension_for_language(&header.language)
            ),
        };

        if content.is_empty() {
            tracing::debug!(name = %name, "skipped empty block");
            return None;
        }

        self.files_emitted += 1;
        Some(GeneratedFile {
            path: name.clone(),
            name,
            language: header.language,
            content: content.to_string(),
        })
    }
}
