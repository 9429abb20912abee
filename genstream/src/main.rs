// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use genstream::config::{self, ConfigSource, FileSource, StringSource};
use genstream::server::{self, AppState};
use genstream::upstream;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genstream", about = "Streaming code generation server")]
struct Cli {
    /// Path to the genstream.yaml config file
    #[arg(long, default_value = "genstream.yaml", env = "GENSTREAM_CONFIG")]
    config: PathBuf,

    /// Port to listen on
    #[arg(long, default_value_t = 3001, env = "GENSTREAM_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "GENSTREAM_BIND")]
    bind: IpAddr,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let addr = SocketAddr::new(cli.bind, cli.port);
    tracing::info!(%addr, "genstream starting");

    let source: Box<dyn ConfigSource> = if cli.config.exists() {
        Box::new(FileSource::new(&cli.config))
    } else {
        tracing::warn!(path = %cli.config.display(), "config file not found; using defaults");
        Box::new(StringSource::defaults())
    };
    tracing::info!(origin = %source.origin(), "loading config");
    let config = match config::load_config(source.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        version = %config.version,
        upstream = ?config.upstream.mode,
        model = %config.upstream.model,
        classifier = ?config.classifier,
        zero_files = ?config.completion.zero_files,
        fingerprint = %config.fingerprint,
        "config loaded"
    );

    let text_source = upstream::build_source(&config);
    let app = server::build_router(AppState::new(&config, text_source));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "genstream listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
    tracing::info!("genstream stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
