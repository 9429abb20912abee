// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

use super::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Parsed and validated genstream config.
#[derive(Debug, Clone)]
pub struct Config {
    /// Config format version. Always "v1".
    pub version: String,
    pub upstream: UpstreamConfig,
    pub classifier: ClassifierMode,
    pub completion: CompletionConfig,
    pub fallback: FallbackConfig,
    pub server: ServerConfig,
    /// SHA256 hash of the raw YAML: "sha256:{hex}".
    pub fingerprint: String,
}

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMode {
    /// Anthropic Messages streaming API.
    Anthropic,
    /// Built-in demo generator; needs no credentials.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Effective mode. `Anthropic` is downgraded to `Fallback` at load time
    /// when no usable API key resolves.
    pub mode: UpstreamMode,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Total request timeout. `None` leaves it to the transport.
    pub timeout_ms: Option<u64>,
    pub system_prompt: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            mode: UpstreamMode::Fallback,
            base_url: defaults::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: defaults::DEFAULT_MODEL.to_string(),
            max_tokens: defaults::DEFAULT_MAX_TOKENS,
            temperature: defaults::DEFAULT_TEMPERATURE,
            timeout_ms: None,
            system_prompt: defaults::DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline behaviour
// ---------------------------------------------------------------------------

/// Which phase classifier a generation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierMode {
    /// Per-delta labelling; markers split across deltas are missed.
    #[default]
    ChunkLocal,
    /// Holds back partial markers and splits at marker boundaries.
    Lookback,
}

/// What a successful generation that produced no files reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroFilePolicy {
    /// `done` with `filesGenerated: 0`.
    #[default]
    Done,
    /// `error` with "no files were generated".
    Error,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionConfig {
    pub zero_files: ZeroFilePolicy,
}

#[derive(Debug, Clone, Copy)]
pub struct FallbackConfig {
    /// Characters per emitted delta.
    pub chunk_chars: usize,
    /// Pause between deltas.
    pub delay_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            chunk_chars: defaults::DEFAULT_CHUNK_CHARS,
            delay_ms: defaults::DEFAULT_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Value of `Access-Control-Allow-Origin`.
    pub allow_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allow_origin: defaults::DEFAULT_ALLOW_ORIGIN.to_string(),
        }
    }
}
