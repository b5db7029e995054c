//! Plugin subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup):
//!     PluginSpec → registry.rs (id, label, declared inputs)
//!     → setup hook runs once with the EngineBuilder
//!
//! Built-in plugins:
//!     har.rs   → `har-load` action, recorded call lookup
//!     proxy.rs → `target` input selecting an upstream per session
//!
//! Session input:
//!     reset_input  → plugin_state = declared defaults
//!     update_input → plugin_state[plugin][input] = value
//!     get_input / get_input_value → read, missing = None
//! ```
//!
//! # Design Decisions
//! - Plugins are never unregistered
//! - Values are not type-checked against the declared kind
//! - Inputs are undefined for a session until reset_input has run

pub mod har;
pub mod input;
pub mod proxy;
pub mod registry;

pub use input::{InputField, InputKind};
pub use registry::{Plugin, PluginRegistry, PluginSpec, SetupHook};
