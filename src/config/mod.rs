//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → MockConfig (validated, immutable)
//!     → EngineBuilder::from_config (routes, plugins, profiles)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Cross references (profiles → routes, actions → plugins) are checked
//!   by the engine builder, which also sees programmatic registrations

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config};
pub use schema::{
    AdminConfig, ListenerConfig, MockConfig, ObservabilityConfig, PluginConfig, PredicateConfig, ProxyConfig,
    RouteConfig, StateBackendKind, StateConfig, VariantConfig,
};
