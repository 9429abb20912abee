// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use super::defaults::MINIMAL_YAML;
use super::error::ConfigError;

/// Supplies raw config YAML to the loader.
pub trait ConfigSource {
    fn load(&self) -> Result<String, ConfigError>;

    /// Where the YAML came from, for startup logs and error messages.
    fn origin(&self) -> String;
}

/// `genstream.yaml` on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String, ConfigError> {
        std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            origin: self.origin(),
            source,
        })
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory YAML: tests, and the built-in defaults when no file exists.
pub struct StringSource {
    content: String,
    origin: &'static str,
}

impl StringSource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            origin: "<inline>",
        }
    }

    /// The minimal `genstream: v1` document; every key takes its default.
    pub fn defaults() -> Self {
        Self {
            content: MINIMAL_YAML.to_string(),
            origin: "<built-in defaults>",
        }
    }
}

impl ConfigSource for StringSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(self.content.clone())
    }

    fn origin(&self) -> String {
        self.origin.to_string()
    }
}
