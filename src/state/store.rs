//! In-memory session state store.
//!
//! # Responsibilities
//! - Own every session's [`SessionState`]
//! - Hand out scoped, lazily created regions to callers
//! - Reset route state without touching plugin input
//! - Forget sessions that sat idle too long or overflow the size bound
//!
//! # Design Decisions
//! - Regions are reached through closures; the session's shard lock is
//!   held only for the duration of the closure
//! - Callers must not run user code (predicates, handlers) inside a
//!   closure, or a nested access to the same session deadlocks
//! - Reads that miss never create a session and never count as activity
//! - Eviction never runs while a shard guard is held

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::observability::metrics;
use crate::state::session::{PluginState, RouteState, SessionId, SessionState, StateMap, StateScope};

/// Bounds on how many sessions the store keeps and for how long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions untouched for longer than this are swept.
    pub idle_ttl: Option<Duration>,
    /// Creating a session beyond this count evicts the least recently used.
    pub max_sessions: Option<usize>,
}

#[derive(Debug)]
struct Entry {
    state: SessionState,
    touched: Instant,
}

impl Entry {
    fn new(state: SessionState) -> Self {
        Self {
            state,
            touched: Instant::now(),
        }
    }
}

/// Process-lifetime store of per-session state.
#[derive(Debug, Default)]
pub struct StateStore {
    sessions: DashMap<SessionId, Entry>,
    limits: SessionLimits,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            sessions: DashMap::new(),
            limits,
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// True once the session has been touched.
    pub fn contains(&self, session: &SessionId) -> bool {
        self.sessions.contains_key(session)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Create the session from `seed` if absent, otherwise mark it active.
    ///
    /// Returns true when it was created.
    pub fn insert_if_absent(&self, session: &SessionId, seed: impl FnOnce() -> SessionState) -> bool {
        let mut created = false;
        {
            let mut entry = self.sessions.entry(session.clone()).or_insert_with(|| {
                created = true;
                Entry::new(seed())
            });
            entry.touched = Instant::now();
        }
        if created {
            self.enforce_capacity(session);
            metrics::record_sessions(self.sessions.len());
        }
        created
    }

    /// Run `f` against the whole session, creating it on first use.
    pub fn with_session<R>(&self, session: &SessionId, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut entry = self
            .sessions
            .entry(session.clone())
            .or_insert_with(|| Entry::new(SessionState::default()));
        entry.touched = Instant::now();
        f(&mut entry.state)
    }

    /// Run `f` against the session's region for `route_id`.
    ///
    /// Repeated calls for the same session and route see the same live region.
    pub fn route_state<R>(
        &self,
        session: &SessionId,
        route_id: &str,
        f: impl FnOnce(&mut RouteState) -> R,
    ) -> R {
        self.with_session(session, |state| f(state.route_mut(route_id)))
    }

    /// Run `f` against the user-state region selected by `scope`.
    pub fn user_state<R>(
        &self,
        session: &SessionId,
        scope: &StateScope,
        f: impl FnOnce(&mut StateMap) -> R,
    ) -> R {
        self.with_session(session, |state| f(state.user_mut(scope)))
    }

    /// Read a single user-state value.
    pub fn user_value(&self, session: &SessionId, scope: &StateScope, key: &str) -> Option<Value> {
        self.sessions
            .get(session)
            .and_then(|entry| entry.state.user_value(scope, key).cloned())
    }

    /// Variant pinned for the route, if any.
    pub fn selected_variant(&self, session: &SessionId, route_id: &str) -> Option<String> {
        self.sessions
            .get(session)
            .and_then(|entry| entry.state.routes.get(route_id)?.selected_variant.clone())
    }

    /// Session value of a route input, without falling back to defaults.
    pub fn route_input(&self, session: &SessionId, route_id: &str, input_id: &str) -> Option<Value> {
        self.sessions
            .get(session)
            .and_then(|entry| entry.state.routes.get(route_id)?.input.get(input_id).cloned())
    }

    /// Clone of the session's plugin input; empty for unknown sessions.
    pub fn plugin_state(&self, session: &SessionId) -> PluginState {
        self.sessions
            .get(session)
            .map(|entry| entry.state.plugin_state.clone())
            .unwrap_or_default()
    }

    /// A single plugin input value.
    pub fn plugin_value(&self, session: &SessionId, plugin_id: &str, input_id: &str) -> Option<Value> {
        self.sessions
            .get(session)
            .and_then(|entry| entry.state.plugin_state.get(plugin_id)?.get(input_id).cloned())
    }

    /// Clear all route and variant state for the session.
    ///
    /// Plugin input is left alone; re-seeding it is always a separate step.
    pub fn reset_route_state(&self, session: &SessionId) {
        self.with_session(session, SessionState::reset_routes);
        tracing::debug!(session = %session, "Route state reset");
    }

    /// Forget the session entirely.
    pub fn remove(&self, session: &SessionId) -> bool {
        let removed = self.sessions.remove(session).is_some();
        if removed {
            metrics::record_sessions(self.sessions.len());
        }
        removed
    }

    /// Clone of the full session state, if it exists.
    pub fn snapshot(&self, session: &SessionId) -> Option<SessionState> {
        self.sessions.get(session).map(|entry| entry.state.clone())
    }

    /// Drop sessions idle for longer than the configured TTL.
    ///
    /// Returns how many were dropped; always zero without a TTL.
    pub fn evict_idle(&self) -> usize {
        let Some(ttl) = self.limits.idle_ttl else {
            return 0;
        };
        self.evict_idle_since(Instant::now(), ttl)
    }

    fn evict_idle_since(&self, now: Instant, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.touched) <= ttl);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.sessions.len(), "Idle sessions evicted");
            metrics::record_sessions(self.sessions.len());
        }
        evicted
    }

    /// Evict least recently used sessions until the bound holds, sparing
    /// `keep`.
    fn enforce_capacity(&self, keep: &SessionId) {
        let Some(max) = self.limits.max_sessions else {
            return;
        };
        while self.sessions.len() > max {
            let oldest = self
                .sessions
                .iter()
                .filter(|entry| entry.key() != keep)
                .min_by_key(|entry| entry.touched)
                .map(|entry| entry.key().clone());
            let Some(oldest) = oldest else {
                break;
            };
            self.sessions.remove(&oldest);
            tracing::debug!(session = %oldest, max, "Session evicted over capacity");
        }
    }
}
