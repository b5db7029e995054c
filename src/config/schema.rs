//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mock
//! server. All types derive Serde traits for deserialization from TOML.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plugins::input::InputField;
use crate::profiles::Profile;
use crate::state::{SessionLimits, StateMap};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MockConfig {
    /// Engine identifier shown by the admin API.
    pub id: Option<String>,

    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// How sessions are identified.
    pub state: StateConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Built-in HAR viewer plugin.
    pub har: HarConfig,

    /// Built-in upstream proxy plugin.
    pub proxy: ProxyConfig,

    /// Declared routes and their variants.
    pub routes: Vec<RouteConfig>,

    /// Declared plugins with their inputs.
    pub plugins: Vec<PluginConfig>,

    /// Profile id → route id → instruction.
    pub profiles: BTreeMap<String, Profile>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Session identification strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackendKind {
    /// One fixed session for every client.
    Static,
    /// Session id taken from a request header.
    Header,
    /// Session id kept in a cookie.
    #[default]
    #[serde(alias = "request")]
    Cookie,
}

/// Session state configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StateConfig {
    pub backend: StateBackendKind,

    /// Cookie carrying the session id (cookie backend).
    pub cookie_name: String,

    /// Header carrying the session id (header backend).
    pub header_name: String,

    /// Session id used by the static backend.
    pub static_session: String,

    /// Seconds a session may sit idle before it is swept; 0 keeps sessions
    /// forever.
    pub session_ttl_secs: u64,

    /// Upper bound on sessions held in memory; 0 means unbounded.
    pub max_sessions: usize,

    /// Seconds between idle-session sweeps.
    pub sweep_interval_secs: u64,
}

impl StateConfig {
    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            idle_ttl: (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs)),
            max_sessions: (self.max_sessions > 0).then_some(self.max_sessions),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackendKind::Cookie,
            cookie_name: "smocks-session".to_string(),
            header_name: "x-smocks-session".to_string(),
            static_session: "default".to_string(),
            session_ttl_secs: 3600,
            max_sessions: 10_000,
            sweep_interval_secs: 60,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Path prefix the admin API is mounted under.
    pub prefix: String,

    /// Bearer token required by the admin API; open when unset.
    pub api_key: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "/_admin".to_string(),
            api_key: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarConfig {
    pub enabled: bool,
}

impl Default for HarConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Proxy plugin configuration.
///
/// The plugin is registered only when enabled with at least one target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,

    /// Target name → upstream base URL.
    pub targets: BTreeMap<String, String>,

    /// Upstream request timeout.
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            targets: BTreeMap::new(),
            timeout_secs: 30,
        }
    }
}

/// Route declaration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Route identifier; derived from method and path when absent.
    pub id: Option<String>,

    /// Path pattern, e.g. "/api/users/{id}".
    pub path: Option<String>,

    /// HTTP method; any method when absent.
    pub method: Option<String>,

    pub label: Option<String>,

    /// Static metadata readable through the execution context.
    pub meta: StateMap,

    /// Route-scoped inputs.
    pub input: BTreeMap<String, InputField>,

    pub variants: Vec<VariantConfig>,
}

/// Variant declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VariantConfig {
    pub id: String,

    pub label: Option<String>,

    /// Fallback variant of the route.
    pub default: bool,

    pub status: u16,

    pub headers: BTreeMap<String, String>,

    /// JSON body.
    pub body: Option<Value>,

    /// Plain-text body; ignored when `body` is set.
    pub text: Option<String>,

    /// Activation predicate.
    pub when: Option<PredicateConfig>,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            label: None,
            default: false,
            status: 200,
            headers: BTreeMap::new(),
            body: None,
            text: None,
            when: None,
        }
    }
}

/// Declarative predicate: exactly one of `state`, `input` or `meta` names
/// the key compared against `equals`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PredicateConfig {
    pub state: Option<String>,
    pub input: Option<String>,
    pub meta: Option<String>,
    pub equals: Value,
}

/// Plugin declaration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PluginConfig {
    pub id: String,
    pub label: Option<String>,
    pub input: BTreeMap<String, InputField>,
}
