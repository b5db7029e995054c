//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout (fmt subscriber, filtered by RUST_LOG or config level)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (session, route, variant) on every event
//! - Metrics are cheap; without an installed recorder they are no-ops
//! - Session ids are never used as metric labels

pub mod logging;
pub mod metrics;
