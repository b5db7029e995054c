//! Session-state and resolution engine.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     EngineBuilder (routes, plugins + setup hooks, profiles, actions)
//!     → validate (all problems at once)
//!     → Engine (registries frozen, shared via Arc)
//!     → StateBackend::initialize
//!
//! Request:
//!     SessionId → initialize_session (seed plugin input on first sight)
//!     → find_route (method, path)
//!     → routes().active_variant
//!           pinned variant > first predicate that holds > default
//!     → Variant::render(ExecutionContext, RequestData)
//!
//! Side channels (admin):
//!     profiles().apply, plugins().update_input, routes().select_variant,
//!     actions().execute → StateStore
//! ```
//!
//! # Design Decisions
//! - Registries are immutable after `build`; reads need no locking
//! - The state store is the only mutable part and is keyed by session
//! - Lookup misses are `None` / `false`; user code errors pass through

pub mod builder;
pub mod context;
pub mod snapshot;
pub mod types;

use axum::http::Method;
use serde_json::Value;

use crate::actions::{Action, ActionRegistry};
use crate::observability::metrics;
use crate::plugins::{Plugin, PluginRegistry};
use crate::profiles::{Profile, ProfileRegistry, ProfileSelector, RouteInstruction};
use crate::routing::{MockResponse, RequestData, Route, RouteMatch, RouteRegistry, Variant};
use crate::state::{PluginState, SessionId, SessionState, StateBackend, StateStore};

pub use builder::EngineBuilder;
pub use context::ExecutionContext;
pub use snapshot::SessionSnapshot;
pub use types::{ConfigError, HandlerError, HandlerResult, ValidationError};

/// Frozen configuration plus per-session state.
#[derive(Debug)]
pub struct Engine {
    id: String,
    routes: RouteRegistry,
    plugins: PluginRegistry,
    profiles: ProfileRegistry,
    actions: ActionRegistry,
    store: StateStore,
    backend: StateBackend,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &StateStore {
        &self.store
    }

    pub fn backend(&self) -> &StateBackend {
        &self.backend
    }

    pub fn routes(&self) -> Routes<'_> {
        Routes { engine: self }
    }

    pub fn plugins(&self) -> Plugins<'_> {
        Plugins { engine: self }
    }

    pub fn profiles(&self) -> Profiles<'_> {
        Profiles { engine: self }
    }

    pub fn actions(&self) -> Actions<'_> {
        Actions { engine: self }
    }

    /// Create the session on first sight and seed its plugin input.
    ///
    /// Returns true when the session was new.
    ///
    /// The session is created with its plugin input already seeded, so a
    /// concurrent first request never observes it without defaults.
    pub fn initialize_session(&self, session: &SessionId) -> bool {
        let created = self.store.insert_if_absent(session, || SessionState {
            plugin_state: self.plugins.defaults(),
            ..SessionState::default()
        });
        if created {
            tracing::debug!(session = %session, "Session initialized");
        }
        created
    }

    /// Context bound to the session only; state is session-wide.
    pub fn context<'a>(&'a self, session: &'a SessionId) -> ExecutionContext<'a> {
        ExecutionContext::new(self, session)
    }

    /// Context bound to a route but no variant; state is route-wide.
    ///
    /// This is the context predicates of that route see.
    pub fn route_context<'a>(&'a self, session: &'a SessionId, route_id: &str) -> Option<ExecutionContext<'a>> {
        let route = self.routes.get(route_id)?;
        Some(ExecutionContext::new(self, session).with_route(route))
    }

    /// Route answering `method` on `path`.
    pub fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.find(method, path)
    }

    /// Resolve the active variant of `route` and render it.
    ///
    /// `Ok(None)` means the route has no variant to offer, which a
    /// validated engine never produces.
    pub fn respond(
        &self,
        session: &SessionId,
        route: &Route,
        request: &RequestData,
    ) -> HandlerResult<Option<MockResponse>> {
        let Some(variant) = self.routes().resolve(route, session)? else {
            return Ok(None);
        };
        let ctx = ExecutionContext::new(self, session)
            .with_route(route)
            .with_variant(variant.id());
        variant.render(&ctx, request).map(Some)
    }

    /// Serializable view of everything the session sees.
    pub fn snapshot(&self, session: &SessionId) -> HandlerResult<SessionSnapshot> {
        SessionSnapshot::capture(self, session)
    }
}

/// Route operations bound to an engine.
#[derive(Clone, Copy)]
pub struct Routes<'e> {
    engine: &'e Engine,
}

impl<'e> Routes<'e> {
    pub fn get(&self, id: &str) -> Option<&'e Route> {
        self.engine.routes.get(id)
    }

    pub fn all(&self) -> &'e [Route] {
        self.engine.routes.all()
    }

    /// Active variant of the route for the session.
    pub fn active_variant(&self, route_id: &str, session: &SessionId) -> HandlerResult<Option<&'e Variant>> {
        match self.get(route_id) {
            Some(route) => self.resolve(route, session),
            None => Ok(None),
        }
    }

    /// Resolve for serving; logged and counted.
    pub(crate) fn resolve(&self, route: &'e Route, session: &SessionId) -> HandlerResult<Option<&'e Variant>> {
        let variant = self.peek(route, session)?;
        if let Some(variant) = variant {
            tracing::debug!(session = %session, route = %route.id(), variant = %variant.id(), "Variant resolved");
            metrics::record_resolution(route.id(), variant.id());
        }
        Ok(variant)
    }

    /// Resolve for reporting only; nothing is recorded.
    pub(crate) fn peek(&self, route: &'e Route, session: &SessionId) -> HandlerResult<Option<&'e Variant>> {
        let pinned = self.engine.store.selected_variant(session, route.id());
        let ctx = ExecutionContext::new(self.engine, session).with_route(route);
        route.resolve_active(&ctx, pinned.as_deref())
    }

    /// Pin a variant for the session. False for unknown routes or variants.
    pub fn select_variant(&self, route_id: &str, variant_id: &str, session: &SessionId) -> bool {
        let Some(route) = self.get(route_id) else {
            return false;
        };
        if route.variant(variant_id).is_none() {
            return false;
        }
        self.engine.store.route_state(session, route_id, |state| {
            state.selected_variant = Some(variant_id.to_string());
        });
        tracing::info!(session = %session, route = %route_id, variant = %variant_id, "Variant selected");
        true
    }

    /// Drop the pinned variant so predicates and the default apply again.
    pub fn clear_selection(&self, route_id: &str, session: &SessionId) -> bool {
        if self.get(route_id).is_none() {
            return false;
        }
        self.engine
            .store
            .route_state(session, route_id, |state| state.selected_variant.take())
            .is_some()
    }

    /// Set a route input for the session. False for unknown routes.
    pub fn update_input(&self, route_id: &str, input_id: &str, value: Value, session: &SessionId) -> bool {
        if self.get(route_id).is_none() {
            return false;
        }
        self.engine.store.route_state(session, route_id, |state| {
            state.input.insert(input_id.to_string(), value);
        });
        true
    }

    /// Session value of a route input, else its declared default.
    pub fn input_value(&self, route_id: &str, input_id: &str, session: &SessionId) -> Option<Value> {
        self.engine
            .store
            .route_input(session, route_id, input_id)
            .or_else(|| {
                let field = self.get(route_id)?.input().get(input_id)?;
                Some(field.default_value.clone())
            })
    }
}

/// Plugin operations bound to an engine.
#[derive(Clone, Copy)]
pub struct Plugins<'e> {
    engine: &'e Engine,
}

impl<'e> Plugins<'e> {
    pub fn get(&self, id: &str) -> Option<&'e Plugin> {
        self.engine.plugins.get(id)
    }

    pub fn all(&self) -> &'e [Plugin] {
        self.engine.plugins.all()
    }

    /// Replace the session's plugin input with every declared default.
    pub fn reset_input(&self, session: &SessionId) {
        let defaults = self.engine.plugins.defaults();
        self.engine.store.with_session(session, |state| {
            state.plugin_state = defaults;
        });
        tracing::debug!(session = %session, "Plugin input reset");
    }

    /// Set one input value, creating the plugin's map on first write.
    pub fn update_input(&self, plugin_id: &str, input_id: &str, value: Value, session: &SessionId) {
        self.engine.store.with_session(session, |state| {
            state
                .plugin_state
                .entry(plugin_id.to_string())
                .or_default()
                .insert(input_id.to_string(), value);
        });
        tracing::debug!(session = %session, plugin = %plugin_id, input = %input_id, "Plugin input updated");
        metrics::record_plugin_input_update(plugin_id);
    }

    pub fn get_input(&self, session: &SessionId) -> PluginState {
        self.engine.store.plugin_state(session)
    }

    pub fn get_input_value(&self, plugin_id: &str, input_id: &str, session: &SessionId) -> Option<Value> {
        self.engine.store.plugin_value(session, plugin_id, input_id)
    }
}

/// Profile operations bound to an engine.
#[derive(Clone, Copy)]
pub struct Profiles<'e> {
    engine: &'e Engine,
}

impl<'e> Profiles<'e> {
    pub fn get(&self, id: &str) -> Option<&'e Profile> {
        self.engine.profiles.get(id)
    }

    pub fn all(&self) -> &'e std::collections::BTreeMap<String, Profile> {
        self.engine.profiles.all()
    }

    /// Apply a profile to the session.
    ///
    /// Unknown ids return false before anything is touched. Otherwise route
    /// state is reset, every route receives its instruction (an empty one
    /// when the profile does not mention it), and plugin input goes back to
    /// defaults, all under a single session lock.
    pub fn apply<'p>(&self, selector: impl Into<ProfileSelector<'p>>, session: &SessionId) -> bool {
        let selector = selector.into();
        let label = match selector {
            ProfileSelector::Id(id) => id,
            ProfileSelector::Spec(_) => "<inline>",
        };
        let Some(profile) = self.engine.profiles.resolve(selector) else {
            tracing::warn!(session = %session, profile = %label, "Unknown profile");
            metrics::record_profile_application(metrics::UNKNOWN_LABEL, false);
            return false;
        };

        let empty = RouteInstruction::default();
        let routes = self.engine.routes.all();
        let defaults = self.engine.plugins.defaults();
        self.engine.store.with_session(session, |state| {
            state.reset_routes();
            for route in routes {
                let instruction = profile.instruction(route.id()).unwrap_or(&empty);
                instruction.apply(route, state.route_mut(route.id()));
            }
            state.plugin_state = defaults;
        });

        tracing::info!(session = %session, profile = %label, "Profile applied");
        metrics::record_profile_application(label, true);
        true
    }
}

/// Action operations bound to an engine.
#[derive(Clone, Copy)]
pub struct Actions<'e> {
    engine: &'e Engine,
}

impl<'e> Actions<'e> {
    pub fn get(&self, id: &str) -> Option<&'e Action> {
        self.engine.actions.get(id)
    }

    pub fn all(&self) -> &'e std::collections::BTreeMap<String, Action> {
        self.engine.actions.all()
    }

    /// Run an action. `Ok(false)` when no such action exists; handler
    /// errors are returned untouched.
    pub fn execute(&self, id: &str, mut input: Value, session: &SessionId) -> HandlerResult<bool> {
        let Some(action) = self.get(id) else {
            tracing::debug!(session = %session, action = %id, "Unknown action");
            return Ok(false);
        };

        let mut ctx = ExecutionContext::new(self.engine, session);
        if let Some(route) = action.route_id().and_then(|r| self.engine.routes.get(r)) {
            ctx = ctx.with_route(route);
            if let Some(variant) = self.engine.routes().resolve(route, session)? {
                ctx = ctx.with_variant(variant.id());
            }
        }
        if let Some(plugin) = action.plugin_id() {
            ctx = ctx.with_plugin(plugin);
        }

        let outcome = action.invoke(&ctx, &mut input);
        metrics::record_action(id, outcome.is_ok());
        outcome?;
        tracing::info!(session = %session, action = %id, "Action executed");
        Ok(true)
    }
}
