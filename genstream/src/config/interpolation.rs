// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// `${VAR}` expansion for string-valued config keys.
//
// Only complete, non-empty references are expanded. `$5`, `${` without a
// closing brace, and `${}` are copied through unchanged.

use super::error::ConfigError;

const OPEN: &str = "${";

/// Expand every `${VAR}` in `value`, the value of config key `key`.
pub fn resolve_variables(key: &str, value: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let name = &after[..end];
        if name.is_empty() {
            out.push_str("${}");
        } else {
            let resolved = std::env::var(name).map_err(|_| ConfigError::UndefinedVariable {
                name: name.to_string(),
                key: key.to_string(),
            })?;
            out.push_str(&resolved);
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// `resolve_variables` for keys that may be absent.
pub fn resolve_optional(key: &str, value: Option<&str>) -> Result<Option<String>, ConfigError> {
    value.map(|v| resolve_variables(key, v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_references_is_unchanged() {
        assert_eq!(resolve_variables("k", "cost: $5 {x}").unwrap(), "cost: $5 {x}");
    }

    #[test]
    fn malformed_references_kept_literally() {
        assert_eq!(resolve_variables("k", "a ${unclosed").unwrap(), "a ${unclosed");
        assert_eq!(resolve_variables("k", "empty ${} ok").unwrap(), "empty ${} ok");
    }

    #[test]
    fn every_reference_expands() {
        std::env::set_var("GENSTREAM_INTERP_HOST", "api.example");
        let out =
            resolve_variables("k", "https://${GENSTREAM_INTERP_HOST}/${GENSTREAM_INTERP_HOST}")
                .unwrap();
        assert_eq!(out, "https://api.example/api.example");
    }

    #[test]
    fn undefined_variable_names_key() {
        let err = resolve_variables("upstream.model", "m-${GENSTREAM_SURELY_UNSET_VAR}").unwrap_err();
        match err {
            ConfigError::UndefinedVariable { name, key } => {
                assert_eq!(name, "GENSTREAM_SURELY_UNSET_VAR");
                assert_eq!(key, "upstream.model");
            }
            other => panic!("expected undefined variable, got {other:?}"),
        }
    }
}
