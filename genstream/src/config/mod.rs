// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads genstream.yaml, validates structure, resolves variable
// interpolation, and computes a deterministic fingerprint of the raw file.

mod defaults;
mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use defaults::{
    API_KEY_ENV, API_KEY_PLACEHOLDER, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, MINIMAL_YAML,
};
pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::{compute_hash, load_config};
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::*;
