// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal).
// Strings stay strings here; interpolation and enum parsing happen in the
// loader so errors can name the offending key.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub genstream: String,
    pub upstream: Option<RawUpstreamConfig>,
    pub classifier: Option<String>,
    pub completion: Option<RawCompletionConfig>,
    pub fallback: Option<RawFallbackConfig>,
    pub server: Option<RawServerConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawUpstreamConfig {
    pub mode: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub timeout_ms: Option<u64>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCompletionConfig {
    pub zero_files: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawFallbackConfig {
    pub chunk_chars: Option<usize>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawServerConfig {
    pub allow_origin: Option<String>,
}
