//! Route registry.
//!
//! # Responsibilities
//! - Store routes in declaration order
//! - Fork or mutate routes on method assignment
//! - Validate id uniqueness and default variants in one pass
//! - Look up the route answering a request
//!
//! # Design Decisions
//! - Mutable only while the engine is being built
//! - Lookup misses are `None`, never errors
//! - Most specific path wins; method-bound routes beat method-less ones;
//!   ties go to the earliest declaration

use std::collections::{BTreeMap, HashSet};

use axum::http::Method;
use serde_json::Value;

use crate::engine::types::{ConfigError, ValidationError};
use crate::plugins::input::InputField;
use crate::routing::route::{Route, RouteSpec};
use crate::routing::variant::Variant;

/// Handle to a registered route, valid for the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey(usize);

/// A route matched against a request path.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: BTreeMap<String, String>,
}

/// All declared routes.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Vec<Route>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. Fails when the `RouteSpec` carries no path.
    pub fn register(&mut self, mut spec: RouteSpec) -> Result<RouteKey, ConfigError> {
        let path = spec.path.take().ok_or(ConfigError::MissingPath)?;
        self.routes.push(Route::from_spec(spec, path));
        Ok(RouteKey(self.routes.len() - 1))
    }

    /// Assign `method` to a route.
    ///
    /// A route that already owns variants keeps its method; a new route on
    /// the same path is registered instead and its key returned.
    pub fn with_method(&mut self, key: RouteKey, method: Method) -> RouteKey {
        let Some(route) = self.routes.get_mut(key.0) else {
            return key;
        };

        if !route.has_variants() {
            route.set_method(method);
            return key;
        }

        let spec = RouteSpec {
            method: Some(method),
            ..RouteSpec::default()
        };
        let forked = Route::from_spec(spec, route.path().to_string());
        tracing::debug!(path = %forked.path(), route = %forked.id(), "Forked route for new method");
        self.routes.push(forked);
        RouteKey(self.routes.len() - 1)
    }

    pub fn add_variant(&mut self, key: RouteKey, variant: Variant) -> Option<&Variant> {
        self.routes.get_mut(key.0).map(|route| route.push_variant(variant))
    }

    pub fn route(&self, key: RouteKey) -> Option<&Route> {
        self.routes.get(key.0)
    }

    pub(crate) fn route_mut(&mut self, key: RouteKey) -> Option<&mut Route> {
        self.routes.get_mut(key.0)
    }

    /// Exact id lookup.
    pub fn get(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.id() == id)
    }

    pub fn all(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route answering `method` on `path`.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let mut best: Option<(RouteMatch<'_>, (usize, usize, bool), bool)> = None;

        for route in self.routes.iter().filter(|r| r.accepts(method)) {
            let Some(params) = route.pattern().matches(path) else {
                continue;
            };
            let rank = route.pattern().specificity();
            let bound = route.method().is_some();
            let better = match &best {
                None => true,
                Some((_, best_rank, best_bound)) => (rank, bound) > (*best_rank, *best_bound),
            };
            if better {
                best = Some((RouteMatch { route, params }, rank, bound));
            }
        }

        best.map(|(found, _, _)| found)
    }

    /// Check every route; reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let mut route_ids = HashSet::new();

        for route in &self.routes {
            if !route_ids.insert(route.id()) {
                errors.push(ValidationError::DuplicateRoute(route.id().to_string()));
            }

            if !route.has_variants() {
                errors.push(ValidationError::NoVariants(route.id().to_string()));
                continue;
            }

            let mut variant_ids = HashSet::new();
            for variant in route.variants() {
                if !variant_ids.insert(variant.id()) {
                    errors.push(ValidationError::DuplicateVariant {
                        route: route.id().to_string(),
                        variant: variant.id().to_string(),
                    });
                }
            }

            match route.variants().iter().filter(|v| v.is_default()).count() {
                0 if route.default_variant().is_none() => {
                    errors.push(ValidationError::NoDefaultVariant(route.id().to_string()));
                }
                0 | 1 => {}
                _ => errors.push(ValidationError::MultipleDefaults(route.id().to_string())),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Fluent registration of one route and its variants.
///
/// Method assignment may move the builder onto a forked route; every
/// later call then applies to the fork.
pub struct RouteBuilder<'a> {
    registry: &'a mut RouteRegistry,
    key: RouteKey,
}

impl<'a> RouteBuilder<'a> {
    pub(crate) fn new(registry: &'a mut RouteRegistry, key: RouteKey) -> Self {
        Self { registry, key }
    }

    pub fn key(&self) -> RouteKey {
        self.key
    }

    pub fn method(mut self, method: Method) -> Self {
        self.key = self.registry.with_method(self.key, method);
        self
    }

    pub fn label(self, label: impl Into<String>) -> Self {
        if let Some(route) = self.registry.route_mut(self.key) {
            route.set_label(label.into());
        }
        self
    }

    pub fn meta(self, id: impl Into<String>, value: Value) -> Self {
        if let Some(route) = self.registry.route_mut(self.key) {
            route.set_meta(id.into(), value);
        }
        self
    }

    pub fn input(self, id: impl Into<String>, field: InputField) -> Self {
        if let Some(route) = self.registry.route_mut(self.key) {
            route.set_input(id.into(), field);
        }
        self
    }

    pub fn variant(self, variant: Variant) -> Self {
        self.registry.add_variant(self.key, variant);
        self
    }
}
