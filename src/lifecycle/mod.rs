//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     MockConfig → EngineBuilder::from_config → build (validate)
//!     → metrics exporter (optional) → session sweeper → bind listener → serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Shutdown::trigger → server stops accepting
//!     → in-flight requests drain → exit
//!
//! Sweeper (sweeper.rs):
//!     tick → StateStore::evict_idle → until shutdown
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: configuration errors abort before the listener binds
//! - Listeners start last (traffic only when the engine is ready)
//! - Session state is in-memory and discarded on exit

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod sweeper;

pub use shutdown::Shutdown;
pub use startup::{build_engine, start, StartupError};
pub use sweeper::SessionSweeper;
