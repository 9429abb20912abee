// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

/// Extension used when a block names no file.
pub const DEFAULT_EXTENSION: &str = "txt";

/// Language recorded when neither the fence nor the path names one.
pub const DEFAULT_LANGUAGE: &str = "txt";

/// Map a fence language token to a file extension. Case-insensitive;
/// unknown languages map to `txt`.
pub fn extension_for_language(language: &str) -> &'static str {
    match language.to_ascii_lowercase().as_str() {
        "typescript" => "ts",
        "javascript" => "js",
        "tsx" => "tsx",
        "jsx" => "jsx",
        "python" => "py",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "css" => "css",
        "html" => "html",
        "json" => "json",
        "yaml" => "yaml",
        "yml" => "yml",
        "sql" => "sql",
        "go" => "go",
        "rust" => "rs",
        "ruby" => "rb",
        "php" => "php",
        "swift" => "swift",
        "kotlin" => "kt",
        _ => DEFAULT_EXTENSION,
    }
}

/// Infer a language from a path's extension, for fences that carry only a
/// path.
pub fn language_for_path(path: &str) -> &'static str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return DEFAULT_LANGUAGE,
    };

    match ext.as_str() {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "json" => "json",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "md" => "markdown",
        "py" => "python",
        "java" => "java",
        "cpp" => "cpp",
        "c" | "h" => "c",
        "go" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "sql" => "sql",
        "sh" => "shell",
        "yaml" | "yml" => "yaml",
        "xml" => "xml",
        "toml" => "toml",
        "swift" => "swift",
        "kt" => "kotlin",
        _ => DEFAULT_LANGUAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_languages_map_to_extensions() {
        assert_eq!(extension_for_language("javascript"), "js");
        assert_eq!(extension_for_language("TypeScript"), "ts");
        assert_eq!(extension_for_language("rust"), "rs");
        assert_eq!(extension_for_language("kotlin"), "kt");
    }

    #[test]
    fn unknown_language_defaults_to_txt() {
        assert_eq!(extension_for_language("brainfuck"), "txt");
        assert_eq!(extension_for_language(""), "txt");
    }

    #[test]
    fn language_inferred_from_path() {
        assert_eq!(language_for_path("src/App.tsx"), "typescript");
        assert_eq!(language_for_path("styles.CSS"), "css");
        assert_eq!(language_for_path("Makefile"), "txt");
        assert_eq!(language_for_path("config.d/settings"), "txt");
    }
}
