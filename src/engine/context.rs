//! Execution context handed to predicates, action handlers and response
//! builders.
//!
//! # Capabilities
//! - `state` / `set_state`: user state of the bound route, or session-wide
//!   state when no route is bound
//! - `variant_state` / `set_variant_state`: state private to the bound
//!   (route, variant) pair
//! - `input`: plugin input when a plugin is bound, otherwise the bound
//!   route's own inputs
//! - `meta`: static route metadata
//!
//! # Design Decisions
//! - The context never exposes the store or the registries
//! - Predicates, route-bound actions and response builders of one route all
//!   share its route region, so a flag set by any of them is what the
//!   predicates read on the next resolution
//! - Every accessor takes the session lock only for its own duration

use serde_json::Value;

use crate::engine::Engine;
use crate::routing::route::Route;
use crate::state::{SessionId, StateScope};

/// Capability object bound to one session and optionally a route, variant
/// and plugin.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    engine: &'a Engine,
    session: &'a SessionId,
    route: Option<&'a Route>,
    variant: Option<&'a str>,
    plugin: Option<&'a str>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(engine: &'a Engine, session: &'a SessionId) -> Self {
        Self {
            engine,
            session,
            route: None,
            variant: None,
            plugin: None,
        }
    }

    pub(crate) fn with_route(mut self, route: &'a Route) -> Self {
        self.route = Some(route);
        self
    }

    pub(crate) fn with_variant(mut self, variant: &'a str) -> Self {
        self.variant = Some(variant);
        self
    }

    pub(crate) fn with_plugin(mut self, plugin: &'a str) -> Self {
        self.plugin = Some(plugin);
        self
    }

    pub fn session(&self) -> &SessionId {
        self.session
    }

    pub fn route_id(&self) -> Option<&'a str> {
        self.route.map(Route::id)
    }

    pub fn variant_id(&self) -> Option<&'a str> {
        self.variant
    }

    pub fn plugin_id(&self) -> Option<&'a str> {
        self.plugin
    }

    /// Region that `state` and `set_state` operate on.
    pub fn scope(&self) -> StateScope {
        StateScope::for_route(self.route_id())
    }

    /// Region private to the bound variant; `None` without one.
    pub fn variant_scope(&self) -> Option<StateScope> {
        Some(StateScope::variant(self.route_id()?, self.variant?))
    }

    /// Read a user-state value.
    pub fn state(&self, id: &str) -> Option<Value> {
        self.engine.state().user_value(self.session, &self.scope(), id)
    }

    /// Write a user-state value.
    pub fn set_state(&self, id: impl Into<String>, value: impl Into<Value>) {
        let scope = self.scope();
        let (id, value) = (id.into(), value.into());
        tracing::trace!(session = %self.session, scope = ?scope, key = %id, "State write");
        self.engine.state().user_state(self.session, &scope, |map| {
            map.insert(id, value);
        });
    }

    /// Remove a user-state value, returning it.
    pub fn clear_state(&self, id: &str) -> Option<Value> {
        self.engine
            .state()
            .user_state(self.session, &self.scope(), |map| map.remove(id))
    }

    /// Read a value private to the bound variant.
    pub fn variant_state(&self, id: &str) -> Option<Value> {
        let scope = self.variant_scope()?;
        self.engine.state().user_value(self.session, &scope, id)
    }

    /// Write a value private to the bound variant.
    ///
    /// Returns false, writing nothing, when no variant is bound.
    pub fn set_variant_state(&self, id: impl Into<String>, value: impl Into<Value>) -> bool {
        let Some(scope) = self.variant_scope() else {
            return false;
        };
        let (id, value) = (id.into(), value.into());
        self.engine.state().user_state(self.session, &scope, |map| {
            map.insert(id, value);
        });
        true
    }

    /// Read an input value.
    pub fn input(&self, id: &str) -> Option<Value> {
        match (self.plugin, self.route) {
            (Some(plugin), _) => self.engine.plugins().get_input_value(plugin, id, self.session),
            (None, Some(route)) => self.engine.routes().input_value(route.id(), id, self.session),
            (None, None) => None,
        }
    }

    /// Read static route metadata.
    pub fn meta(&self, id: &str) -> Option<&'a Value> {
        self.route.and_then(|route| route.meta_value(id))
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("session", self.session)
            .field("route", &self.route_id())
            .field("variant", &self.variant)
            .field("plugin", &self.plugin)
            .finish()
    }
}
