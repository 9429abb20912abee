// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// Fallback generator
//
// Deterministic stand-in for the model when no credentials are configured.
// It is an ordinary `TextStreamSource`, so its output goes through the same
// classification, encoding, and extraction path as real model output.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::config::FallbackConfig;
use crate::generation::GenerationRequest;
use crate::upstream::{TextStreamSource, UpstreamError, UpstreamEvent, UpstreamStream};

const DEMO_REASONING: &str = "<reasoning>\n\
## Approach\n\
No model is configured, so a static demo project is served.\n\
\n\
## Components to Create\n\
1. index.html - Page shell\n\
2. styles.css - Dark theme\n\
3. app.js - Startup log\n\
</reasoning>\n\n";

const DEMO_CONTENT: &str = "```html index.html
<!doctype html>
<html>
  <head>
    <meta charset=\"utf-8\" />
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />
    <title>Demo App</title>
    <link rel=\"stylesheet\" href=\"styles.css\" />
  </head>
  <body>
    <div id=\"app\">Hello from the fallback generator</div>
    <script src=\"app.js\"></script>
  </body>
</html>
```

```css styles.css
body {
  font-family: system-ui, sans-serif;
  margin: 0;
  padding: 3rem;
  background: #0f172a;
  color: #e2e8f0;
}
#app {
  font-size: 1.125rem;
}
```

```javascript app.js
console.log(\"Fallback generator ready\");
```";

/// Number of files the demo project extracts to.
pub const DEMO_FILE_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct FallbackSource {
    chunk_chars: usize,
    delay: Duration,
}

impl FallbackSource {
    pub fn new(config: FallbackConfig) -> Self {
        Self {
            chunk_chars: config.chunk_chars.max(1),
            delay: Duration::from_millis(config.delay_ms),
        }
    }

    /// The full text the source streams, reasoning included.
    pub fn transcript() -> String {
        format!("{DEMO_REASONING}{DEMO_CONTENT}")
    }
}

/// Split on character boundaries into pieces of at most `size` chars.
fn chunk_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

#[async_trait]
impl TextStreamSource for FallbackSource {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn open(&self, request: &GenerationRequest) -> Result<UpstreamStream, UpstreamError> {
        tracing::info!(
            prompt_chars = request.prompt.chars().count(),
            images = request.images.len(),
            "serving fallback demo project"
        );

        let delay = self.delay;
        let reasoning = futures_util::stream::once(async {
            Ok::<_, UpstreamError>(UpstreamEvent::Delta(DEMO_REASONING.to_string()))
        });
        let content = futures_util::stream::iter(chunk_chars(DEMO_CONTENT, self.chunk_chars))
            .then(move |chunk| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok::<_, UpstreamError>(UpstreamEvent::Delta(chunk))
            });
        let completed = futures_util::stream::once(async {
            Ok::<_, UpstreamError>(UpstreamEvent::Completed)
        });

        Ok(Box::pin(reasoning.chain(content).chain(completed)))
    }
}
