//! smocks: stateful mock server library.
//!
//! Routes own ordered response variants; which variant answers is decided
//! per session from pinned selections, activation predicates and defaults.
//! Profiles, plugin inputs and actions change that session state from the
//! side, through the engine API or the admin endpoints.

pub mod actions;
pub mod admin;
pub mod config;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod plugins;
pub mod profiles;
pub mod routing;
pub mod state;

pub use config::schema::MockConfig;
pub use engine::{Engine, EngineBuilder, ExecutionContext};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
