// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

use super::defaults::{self, API_KEY_ENV, API_KEY_PLACEHOLDER};
use super::error::ConfigError;
use super::interpolation::{resolve_optional, resolve_variables};
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a genstream config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source and fingerprint it
/// 2. Parse YAML into raw deserialization types
/// 3. Validate the version and every enumerated value
/// 4. Resolve `${VAR}` interpolation in string fields
/// 5. Resolve the API key and pick the effective upstream mode
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let fingerprint = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.genstream != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.genstream
        )));
    }

    let upstream = build_upstream_config(raw.upstream)?;
    let classifier = parse_classifier(raw.classifier.as_deref())?;
    let completion = build_completion_config(raw.completion)?;
    let fallback = build_fallback_config(raw.fallback)?;
    let server = build_server_config(raw.server)?;

    Ok(Config {
        version: raw.genstream,
        upstream,
        classifier,
        completion,
        fallback,
        server,
        fingerprint,
    })
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

fn build_upstream_config(
    raw: Option<raw::RawUpstreamConfig>,
) -> Result<UpstreamConfig, ConfigError> {
    let raw = raw.unwrap_or_default();

    let requested = match resolve_optional("upstream.mode", raw.mode.as_deref())?.as_deref() {
        Some("anthropic") | None => UpstreamMode::Anthropic,
        Some("fallback") => UpstreamMode::Fallback,
        Some(other) => {
            return Err(ConfigError::Validation(format!(
                "unknown upstream mode \"{other}\", expected \"anthropic\" or \"fallback\""
            )));
        }
    };

    let base_url = resolve_optional("upstream.base_url", raw.base_url.as_deref())?
        .unwrap_or_else(|| defaults::DEFAULT_BASE_URL.to_string());
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "upstream base_url \"{base_url}\" must start with http:// or https://"
        )));
    }

    let temperature = raw.temperature.unwrap_or(defaults::DEFAULT_TEMPERATURE);
    if !(0.0..=1.0).contains(&temperature) {
        return Err(ConfigError::Validation(format!(
            "upstream temperature must be within 0.0..=1.0, got {temperature}"
        )));
    }

    let max_tokens = raw.max_tokens.unwrap_or(defaults::DEFAULT_MAX_TOKENS);
    if max_tokens == 0 {
        return Err(ConfigError::Validation(
            "upstream max_tokens must be greater than 0".to_string(),
        ));
    }

    let api_key = resolve_api_key(raw.api_key.as_deref())?;
    let mode = match (requested, &api_key) {
        (UpstreamMode::Anthropic, None) => {
            tracing::warn!("no API key configured; using fallback generator");
            UpstreamMode::Fallback
        }
        (mode, _) => mode,
    };

    Ok(UpstreamConfig {
        mode,
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key,
        model: resolve_optional("upstream.model", raw.model.as_deref())?
            .unwrap_or_else(|| defaults::DEFAULT_MODEL.to_string()),
        max_tokens,
        temperature,
        timeout_ms: raw.timeout_ms,
        system_prompt: raw
            .system_prompt
            .unwrap_or_else(|| defaults::DEFAULT_SYSTEM_PROMPT.to_string()),
    })
}

/// Config value first, then the environment. Blank values and the sample
/// placeholder count as absent.
fn resolve_api_key(configured: Option<&str>) -> Result<Option<String>, ConfigError> {
    let key = match configured {
        Some(value) => Some(resolve_variables("upstream.api_key", value)?),
        None => std::env::var(API_KEY_ENV).ok(),
    };
    Ok(key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && k != API_KEY_PLACEHOLDER))
}

fn parse_classifier(raw: Option<&str>) -> Result<ClassifierMode, ConfigError> {
    match raw {
        Some("chunk_local") | None => Ok(ClassifierMode::ChunkLocal),
        Some("lookback") => Ok(ClassifierMode::Lookback),
        Some(other) => Err(ConfigError::Validation(format!(
            "unknown classifier \"{other}\", expected \"chunk_local\" or \"lookback\""
        ))),
    }
}

fn build_completion_config(
    raw: Option<raw::RawCompletionConfig>,
) -> Result<CompletionConfig, ConfigError> {
    let zero_files = match raw.and_then(|r| r.zero_files).as_deref() {
        Some("done") | None => ZeroFilePolicy::Done,
        Some("error") => ZeroFilePolicy::Error,
        Some(other) => {
            return Err(ConfigError::Validation(format!(
                "unknown completion zero_files value \"{other}\", expected \"done\" or \"error\""
            )));
        }
    };
    Ok(CompletionConfig { zero_files })
}

fn build_fallback_config(
    raw: Option<raw::RawFallbackConfig>,
) -> Result<FallbackConfig, ConfigError> {
    let raw = match raw {
        Some(r) => r,
        None => return Ok(FallbackConfig::default()),
    };

    let chunk_chars = raw.chunk_chars.unwrap_or(defaults::DEFAULT_CHUNK_CHARS);
    if chunk_chars == 0 {
        return Err(ConfigError::Validation(
            "fallback chunk_chars must be greater than 0".to_string(),
        ));
    }

    Ok(FallbackConfig {
        chunk_chars,
        delay_ms: raw.delay_ms.unwrap_or(defaults::DEFAULT_DELAY_MS),
    })
}

fn build_server_config(raw: Option<raw::RawServerConfig>) -> Result<ServerConfig, ConfigError> {
    let allow_origin = resolve_optional(
        "server.allow_origin",
        raw.and_then(|r| r.allow_origin).as_deref(),
    )?
        .unwrap_or_else(|| defaults::DEFAULT_ALLOW_ORIGIN.to_string());

    if axum::http::HeaderValue::from_str(&allow_origin).is_err() {
        return Err(ConfigError::Validation(format!(
            "server allow_origin \"{allow_origin}\" is not a valid header value"
        )));
    }
    Ok(ServerConfig { allow_origin })
}
