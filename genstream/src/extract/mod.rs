// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Artifact extractor
//
// Turns the accumulated content buffer into an ordered list of files.
// Pure: the same buffer always yields the same list. Never fails; a buffer
// without fenced blocks yields an empty list.

mod languages;
mod tokenizer;

pub use languages::{extension_for_language, language_for_path};
pub use tokenizer::FenceTokenizer;

use crate::frame::GeneratedFile;

/// Extract every fenced block from `buffer`, in order of appearance.
///
/// Blocks that are empty after trimming are dropped. Blocks with no path
/// are named `file<N>.<ext>`, where `N` counts files already extracted.
/// Duplicate paths are kept as separate files.
pub fn extract(buffer: &str) -> Vec<GeneratedFile> {
    let mut tokenizer = FenceTokenizer::new();
    let mut files = tokenizer.feed(buffer);
    files.extend(tokenizer.finish());

    if tokenizer.blocks_seen() == 0 && !buffer.trim().is_empty() {
        tracing::debug!(bytes = buffer.len(), "no fenced blocks found in content");
    }
    tracing::debug!(
        blocks = tokenizer.blocks_seen(),
        files = files.len(),
        "extracted files from content"
    );
    files
}
