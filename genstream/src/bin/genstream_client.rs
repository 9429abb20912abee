// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// genstream-client: stream a generation from a running server.
//
// Usage:
//   genstream-client --prompt "a todo app"
//   genstream-client --prompt "landing page" --image hero.png --out ./site
//
// Reasoning is printed to stderr, content to stdout, as frames arrive.
// Ctrl-C cancels the request; whatever arrived so far is still written.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use base64::Engine;
use clap::Parser;
use genstream::decode::{GenerationClient, Outcome, StreamState};
use genstream::frame::ProtocolFrame;
use genstream::generation::{GenerationRequest, ImageAttachment};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genstream-client", about = "Stream a generation from a genstream server")]
struct Cli {
    /// Base URL of the server
    #[arg(long, default_value = "http://127.0.0.1:3001", env = "GENSTREAM_SERVER")]
    server: String,

    /// Prompt text
    #[arg(long)]
    prompt: String,

    /// Image to attach (png, jpg, gif, webp); repeatable
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Directory to write generated files into
    #[arg(long)]
    out: Option<PathBuf>,

    /// Do not echo reasoning and content while streaming
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn load_image(path: &Path) -> Result<ImageAttachment, String> {
    let mime_type =
        mime_type_for(path).ok_or_else(|| format!("{}: unsupported image type", path.display()))?;
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(ImageAttachment {
        mime_type: mime_type.to_string(),
        base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
    })
}

/// Join `relative` under `root`, refusing absolute paths and `..`.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(root.join(relative))
}

fn write_files(root: &Path, state: &StreamState) -> usize {
    let mut written = 0;
    for file in &state.files {
        let Some(target) = safe_join(root, &file.path) else {
            tracing::warn!(path = %file.path, "refusing to write outside output directory");
            continue;
        };
        let contents = if file.language == "base64" {
            match base64::engine::general_purpose::STANDARD.decode(&file.content) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(path = %file.path, "invalid base64 attachment: {e}");
                    continue;
                }
            }
        } else {
            file.content.clone().into_bytes()
        };

        let result = target
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::write(&target, contents));
        match result {
            Ok(()) => written += 1,
            Err(e) => tracing::warn!(path = %target.display(), "failed to write file: {e}"),
        }
    }
    written
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let images = match cli.images.iter().map(|p| load_image(p)).collect::<Result<Vec<_>, _>>() {
        Ok(images) => images,
        Err(e) => {
            eprintln!("failed to load image {e}");
            std::process::exit(2);
        }
    };
    let request = GenerationRequest {
        prompt: cli.prompt,
        images,
    };

    let client = match GenerationClient::new(&cli.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let quiet = cli.quiet;
    let mut state = StreamState::new();
    let outcome = client
        .generate(&request, &cancel, &mut state, |frame, _| {
            if quiet {
                return;
            }
            match frame {
                ProtocolFrame::Reasoning { content } => eprint!("{content}"),
                ProtocolFrame::Content { content } => {
                    print!("{content}");
                    let _ = std::io::stdout().flush();
                }
                ProtocolFrame::FileComplete { file_name, .. } => eprintln!("\n[file] {file_name}"),
                _ => {}
            }
        })
        .await;

    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => {
            eprintln!("\n{e}");
            std::process::exit(1);
        }
    };

    if let Some(root) = &cli.out {
        let written = write_files(root, &state);
        eprintln!("wrote {written} file(s) to {}", root.display());
    }

    match outcome {
        Outcome::Done { files_generated } => {
            eprintln!("\ndone: {files_generated} file(s) generated");
        }
        Outcome::Failed(message) => {
            eprintln!("\nfailed: {message}");
            std::process::exit(1);
        }
        Outcome::Cancelled => {
            eprintln!(
                "\ncancelled: kept {} file(s), {} reasoning chars, {} content chars",
                state.files.len(),
                state.reasoning_text.chars().count(),
                state.content_text.chars().count()
            );
            std::process::exit(130);
        }
    }
}
