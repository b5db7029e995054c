//! Per-session state layout.
//!
//! # Regions
//! - `plugin_state`: plugin id → input id → current value
//! - `global`: session-wide user state (no route bound)
//! - `routes`: route id → [`RouteState`] (pinned variant, route inputs,
//!   route user state, per-variant user state)

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key/value region holding user state or input values.
pub type StateMap = BTreeMap<String, Value>;

/// Plugin id → input id → value.
pub type PluginState = BTreeMap<String, StateMap>;

/// Opaque session identifier supplied by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Which user-state region an accessor reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateScope {
    /// Session-wide region.
    Global,
    /// Per-route region, shared by the route's predicates, actions and
    /// response builders.
    Route(String),
    /// Per-(route, variant) region, private to one variant.
    Variant { route: String, variant: String },
}

impl StateScope {
    /// Scope of `state()` for an accessor bound to an optional route.
    ///
    /// Every context bound to the same route lands in the same region,
    /// whichever variant it renders.
    pub fn for_route(route: Option<&str>) -> Self {
        match route {
            Some(route) => StateScope::Route(route.to_string()),
            None => StateScope::Global,
        }
    }

    pub fn variant(route: impl Into<String>, variant: impl Into<String>) -> Self {
        StateScope::Variant {
            route: route.into(),
            variant: variant.into(),
        }
    }
}

/// State a session holds for one route.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteState {
    /// Variant pinned by a profile or an ad-hoc selection.
    pub selected_variant: Option<String>,
    /// Session values for the route's declared inputs.
    pub input: StateMap,
    /// Route-level user state.
    pub user: StateMap,
    /// Variant id → user state.
    pub variants: HashMap<String, StateMap>,
}

/// Everything the engine remembers about one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub plugin_state: PluginState,
    pub global: StateMap,
    pub routes: HashMap<String, RouteState>,
}

impl SessionState {
    /// Lazily created per-route region.
    pub fn route_mut(&mut self, route_id: &str) -> &mut RouteState {
        self.routes.entry(route_id.to_string()).or_default()
    }

    /// Lazily created user-state region for `scope`.
    pub fn user_mut(&mut self, scope: &StateScope) -> &mut StateMap {
        match scope {
            StateScope::Global => &mut self.global,
            StateScope::Route(route) => &mut self.route_mut(route).user,
            StateScope::Variant { route, variant } => self
                .route_mut(route)
                .variants
                .entry(variant.clone())
                .or_default(),
        }
    }

    /// Read-only lookup that never creates regions.
    pub fn user_value(&self, scope: &StateScope, key: &str) -> Option<&Value> {
        match scope {
            StateScope::Global => self.global.get(key),
            StateScope::Route(route) => self.routes.get(route)?.user.get(key),
            StateScope::Variant { route, variant } => {
                self.routes.get(route)?.variants.get(variant)?.get(key)
            }
        }
    }

    /// Drops all route and variant state; plugin and session-wide state stay.
    pub fn reset_routes(&mut self) {
        self.routes.clear();
    }
}
