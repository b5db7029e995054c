//! Idle session sweeping.
//!
//! # Responsibilities
//! - Periodically drop sessions idle longer than the configured TTL
//! - Stop when shutdown is signalled

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::engine::Engine;

pub struct SessionSweeper {
    engine: Arc<Engine>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(engine: Arc<Engine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let Some(ttl) = self.engine.state().limits().idle_ttl else {
            tracing::info!("Session sweeping disabled");
            return;
        };

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            ttl_secs = ttl.as_secs(),
            "Session sweeper starting"
        );

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.engine.state().evict_idle();
                    if evicted > 0 {
                        tracing::info!(evicted, "Idle sessions swept");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Session sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
