// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mathlens — formula detection and OCR-to-LaTeX reconstruction tools.
//
// Entry point. Initialises logging (stderr, so stdout carries only MCP
// messages), loads configuration and the pattern store, then serves MCP over
// stdio until the client disconnects.

mod server;
mod tools;

use mathlens_core::config::AppConfig;
use mathlens_core::paths;
use mathlens_document::math::PatternStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config_path = paths::config_dir().join(paths::CONFIG_FILE_NAME);
    let config = AppConfig::load_or_default(&config_path);

    let store = PatternStore::global();
    tracing::info!(
        rules = store.len(),
        source = ?store.source(),
        timeout_secs = config.tool_timeout_secs,
        "Mathlens tool server starting"
    );

    if let Err(err) = server::run_stdio(config).await {
        tracing::error!(%err, "MCP server failed, shutting down");
        std::process::exit(1);
    }
}
