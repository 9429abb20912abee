// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

// genstream-extract: re-parse saved model output into files.
//
// Usage:
//   genstream-extract output.md                 # list files as JSON
//   genstream-extract --frames capture.sse      # decode a captured frame stream
//   cat output.md | genstream-extract --out dir # write files
//
// With --frames the input is a recorded `/api/generate/stream` body. Its
// content is re-extracted and compared against the files the server
// sent, which must match. The model output is rebuilt from reasoning and
// content frames in arrival order, so frame labels do not matter.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use genstream::decode::{FrameDecoder, StreamState};
use genstream::extract::extract;
use genstream::frame::{GeneratedFile, ProtocolFrame};
use genstream::phase::content_text;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genstream-extract", about = "Extract fenced code blocks into files")]
struct Cli {
    /// Input file; stdin when omitted
    input: Option<PathBuf>,

    /// Treat the input as a captured frame stream
    #[arg(long, default_value_t = false)]
    frames: bool,

    /// Directory to write extracted files into
    #[arg(long)]
    out: Option<PathBuf>,
}

fn read_input(path: Option<&PathBuf>) -> std::io::Result<Vec<u8>> {
    match path {
        Some(p) => std::fs::read(p),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Compare re-extracted files with the ones received, ignoring appended
/// attachments.
fn check_frames(state: &StreamState, reparsed: &[GeneratedFile]) -> Result<(), String> {
    let received: Vec<&GeneratedFile> = state
        .files
        .iter()
        .filter(|f| f.language != "base64")
        .collect();
    if received.len() != reparsed.len() {
        return Err(format!(
            "received {} files, re-extraction found {}",
            received.len(),
            reparsed.len()
        ));
    }
    for (index, (got, want)) in received.iter().zip(reparsed).enumerate() {
        if got.path != want.path || got.content != want.content || got.language != want.language {
            return Err(format!("file {index} ({}) differs from re-extraction", got.path));
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let raw = match read_input(cli.input.as_ref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("failed to read input: {e}");
            std::process::exit(2);
        }
    };

    let files = if cli.frames {
        let mut decoder = FrameDecoder::new();
        let mut state = StreamState::new();
        let mut output = String::new();
        for frame in decoder.push(&raw).into_iter().chain(decoder.finish()) {
            if let ProtocolFrame::Reasoning { content } | ProtocolFrame::Content { content } = &frame {
                output.push_str(content);
            }
            state.apply(&frame);
        }
        if decoder.malformed() > 0 {
            eprintln!("skipped {} malformed line(s)", decoder.malformed());
        }

        let reparsed = extract(&content_text(&output));
        if let Err(e) = check_frames(&state, &reparsed) {
            eprintln!("mismatch: {e}");
            std::process::exit(1);
        }
        reparsed
    } else {
        extract(&content_text(&String::from_utf8_lossy(&raw)))
    };

    match &cli.out {
        Some(root) => {
            for file in &files {
                if file.path.split(['/', '\\']).any(|c| c == "..") || file.path.starts_with('/') {
                    eprintln!("skipping unsafe path {}", file.path);
                    continue;
                }
                let target = root.join(&file.path);
                let result = target
                    .parent()
                    .map_or(Ok(()), std::fs::create_dir_all)
                    .and_then(|()| std::fs::write(&target, &file.content));
                if let Err(e) = result {
                    eprintln!("failed to write {}: {e}", target.display());
                    std::process::exit(1);
                }
            }
            eprintln!("wrote {} file(s) to {}", files.len(), root.display());
        }
        None => match serde_json::to_string_pretty(&files) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to encode output: {e}");
                std::process::exit(1);
            }
        },
    }
}
