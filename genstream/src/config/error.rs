// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

/// Why a genstream config could not be turned into a `Config`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config from {origin}: {source}")]
    Read {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Validation(String),

    #[error("{key} references ${{{name}}} but it is not set")]
    UndefinedVariable { name: String, key: String },
}
