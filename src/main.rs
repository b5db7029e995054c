//! smocks mock server (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ state backend ──▶ session id
//!                          │                               │
//!                          ▼                               ▼
//!                     route registry ──▶ active variant ◀── state store
//!                          │              (pinned > predicate > default)
//!                          ▼
//!     ◀────────────── rendered variant (+ Set-Cookie for new sessions)
//!                     or upstream response when the session picked a
//!                     proxy target
//!
//!     Admin API ({prefix}/...)
//!     ──────────────▶ profiles / plugin input / route selection / actions
//!                          └──────────────▶ state store
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use smocks::config::{load_config, MockConfig};
use smocks::lifecycle::{signals, start, Shutdown};
use smocks::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "smocks")]
#[command(about = "Stateful mock server", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("smocks: {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => MockConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        "smocks starting"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    if let Err(e) = start(config, &shutdown).await {
        tracing::error!(error = %e, "smocks failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
