// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_MAX_TOKENS: u32 = 16_000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

pub const DEFAULT_CHUNK_CHARS: usize = 80;
pub const DEFAULT_DELAY_MS: u64 = 10;

pub const DEFAULT_ALLOW_ORIGIN: &str = "*";

/// Environment variable consulted when `upstream.api_key` is not set.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Placeholder shipped in sample env files; treated as no key.
pub const API_KEY_PLACEHOLDER: &str = "REPLACE_WITH_YOUR_API_KEY";

/// Config used when no file is present.
pub const MINIMAL_YAML: &str = "genstream: v1\n";

/// Instructs the model to emit a short `<reasoning>` section followed by
/// fenced code blocks whose headers carry a language and a path.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You generate complete, runnable web applications.

Output has two phases.

PHASE 1 - REASONING
Start with a concise plan wrapped in <reasoning></reasoning> tags, at most
150 words: the approach in two or three sentences, the components to create
as a short numbered list, and any key architectural decision.

PHASE 2 - CODE
After the closing </reasoning> tag, output every file as a fenced code block
whose opening fence names the language and the file path, for example:

```typescript src/components/Header.tsx
export function Header() { ... }
```

Rules:
- One file per block; never merge several files into one block.
- Split the UI into small components, each in its own file.
- Every file must be complete; no placeholders or elided sections.
- When images are attached, reference them as /assets/<name> and size them
  with object-fit and aspect-ratio.
- Do not write prose between code blocks.
";
