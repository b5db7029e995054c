//! Startup orchestration.
//!
//! # Responsibilities
//! - Build and validate the engine from configuration
//! - Start the metrics exporter when enabled
//! - Start the idle session sweeper
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::MockConfig;
use crate::engine::{ConfigError, Engine, EngineBuilder};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::sweeper::SessionSweeper;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the engine a configuration describes.
pub fn build_engine(config: &MockConfig) -> Result<Arc<Engine>, ConfigError> {
    let engine = EngineBuilder::from_config(config)?.build()?;
    Ok(Arc::new(engine))
}

/// Build the engine, bind the listener and serve until `shutdown` fires.
pub async fn start(config: MockConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let engine = build_engine(&config)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let sweeper = SessionSweeper::new(
        engine.clone(),
        Duration::from_secs(config.state.sweep_interval_secs.max(1)),
    );
    tokio::spawn(sweeper.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(engine, &config);
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
