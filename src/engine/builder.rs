//! Engine construction.
//!
//! # Responsibilities
//! - Collect routes, plugins, profiles and actions
//! - Run plugin setup hooks at registration time
//! - Translate a [`MockConfig`] into registrations
//! - Validate everything in one pass before freezing the engine

use axum::http::Method;

use crate::actions::{Action, ActionRegistry};
use crate::config::schema::{MockConfig, PredicateConfig, RouteConfig, VariantConfig};
use crate::engine::types::{ConfigError, ValidationError};
use crate::engine::Engine;
use crate::plugins::har::har_viewer_plugin;
use crate::plugins::proxy::ProxyTargets;
use crate::plugins::{PluginRegistry, PluginSpec};
use crate::profiles::{Profile, ProfileRegistry};
use crate::routing::{Predicate, RouteBuilder, RouteRegistry, RouteSpec, Variant};
use crate::state::{SessionLimits, StateBackend, StateStore};

/// Mutable registration phase of an [`Engine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    id: Option<String>,
    routes: RouteRegistry,
    plugins: PluginRegistry,
    profiles: ProfileRegistry,
    actions: ActionRegistry,
    backend: StateBackend,
    limits: SessionLimits,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = Some(id.into());
        self
    }

    pub fn state_backend(&mut self, backend: StateBackend) -> &mut Self {
        self.backend = backend;
        self
    }

    pub fn session_limits(&mut self, limits: SessionLimits) -> &mut Self {
        self.limits = limits;
        self
    }

    /// Register a route and continue with its builder.
    pub fn route(&mut self, spec: RouteSpec) -> Result<RouteBuilder<'_>, ConfigError> {
        let key = self.routes.register(spec)?;
        Ok(RouteBuilder::new(&mut self.routes, key))
    }

    /// Register a plugin, running its setup hook before returning.
    pub fn plugin(&mut self, spec: PluginSpec) -> Result<&mut Self, ConfigError> {
        let id = spec.id.clone();
        if let Some(hook) = self.plugins.insert(spec) {
            hook(self)?;
        }
        tracing::debug!(plugin = %id, "Plugin registered");
        Ok(self)
    }

    pub fn profile(&mut self, id: impl Into<String>, profile: Profile) -> &mut Self {
        self.profiles.register(id, profile);
        self
    }

    pub fn action(&mut self, action: Action) -> &mut Self {
        self.actions.register(action);
        self
    }

    pub fn action_as(&mut self, id: impl Into<String>, action: Action) -> &mut Self {
        self.actions.register_as(id, action);
        self
    }

    pub fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Register everything a configuration file declares.
    pub fn from_config(config: &MockConfig) -> Result<Self, ConfigError> {
        let mut builder = Self::new();
        if let Some(id) = &config.id {
            builder.id(id.clone());
        }
        builder.state_backend(StateBackend::from_config(&config.state));
        builder.session_limits(config.state.session_limits());

        let mut errors = Vec::new();
        for route in &config.routes {
            builder.register_route_config(route, &mut errors)?;
        }
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        if config.har.enabled {
            builder.plugin(har_viewer_plugin())?;
        }
        if config.proxy.enabled && !config.proxy.targets.is_empty() {
            let targets = ProxyTargets::parse(&config.proxy.targets)?;
            builder.plugin(targets.plugin())?;
        }
        for plugin in &config.plugins {
            let mut spec = PluginSpec::new(plugin.id.clone());
            spec.label = plugin.label.clone();
            spec.input = plugin.input.clone();
            builder.plugin(spec)?;
        }

        for (id, profile) in &config.profiles {
            builder.profile(id.clone(), profile.clone());
        }

        Ok(builder)
    }

    fn register_route_config(
        &mut self,
        config: &RouteConfig,
        errors: &mut Vec<ValidationError>,
    ) -> Result<(), ConfigError> {
        let method = match config.method.as_deref().map(parse_method).transpose() {
            Ok(method) => method,
            Err(method) => {
                errors.push(ValidationError::InvalidMethod {
                    route: config.id.clone().or_else(|| config.path.clone()).unwrap_or_default(),
                    method,
                });
                None
            }
        };

        let spec = RouteSpec {
            id: config.id.clone(),
            path: config.path.clone(),
            method,
            label: config.label.clone(),
            meta: config.meta.clone(),
            input: config.input.clone(),
        };

        let mut route = self.route(spec)?;
        for variant in &config.variants {
            match variant_from_config(variant) {
                Some(v) => route = route.variant(v),
                None => errors.push(ValidationError::InvalidPredicate {
                    route: config.id.clone().or_else(|| config.path.clone()).unwrap_or_default(),
                    variant: variant.id.clone(),
                }),
            }
        }
        Ok(())
    }

    /// Check all registrations; reports every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = match self.routes.validate() {
            Ok(()) => Vec::new(),
            Err(ConfigError::Validation(errors)) => errors,
            Err(other) => return Err(other),
        };

        for (profile_id, profile) in self.profiles.all() {
            for (route_id, instruction) in profile.routes() {
                let Some(route) = self.routes.get(route_id) else {
                    errors.push(ValidationError::UnknownProfileRoute {
                        profile: profile_id.clone(),
                        route: route_id.clone(),
                    });
                    continue;
                };
                if let Some(variant) = &instruction.variant {
                    if route.variant(variant).is_none() {
                        errors.push(ValidationError::UnknownProfileVariant {
                            profile: profile_id.clone(),
                            route: route_id.clone(),
                            variant: variant.clone(),
                        });
                    }
                }
            }
        }

        for action in self.actions.all().values() {
            if let Some(route) = action.route_id() {
                if self.routes.get(route).is_none() {
                    errors.push(ValidationError::UnknownActionBinding {
                        action: action.id().to_string(),
                        target: route.to_string(),
                    });
                }
            }
            if let Some(plugin) = action.plugin_id() {
                if self.plugins.get(plugin).is_none() {
                    errors.push(ValidationError::UnknownActionBinding {
                        action: action.id().to_string(),
                        target: plugin.to_string(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Validate and freeze the engine.
    pub fn build(self) -> Result<Engine, ConfigError> {
        self.validate()?;

        let engine = Engine {
            id: self.id.unwrap_or_else(|| "smocks".to_string()),
            routes: self.routes,
            plugins: self.plugins,
            profiles: self.profiles,
            actions: self.actions,
            store: StateStore::with_limits(self.limits),
            backend: self.backend,
        };

        tracing::info!(
            engine = %engine.id,
            routes = engine.routes.len(),
            plugins = engine.plugins.all().len(),
            profiles = engine.profiles.all().len(),
            actions = engine.actions.all().len(),
            "Engine built"
        );

        engine.backend.initialize(&engine);
        Ok(engine)
    }
}

fn parse_method(method: &str) -> Result<Method, String> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).map_err(|_| method.to_string())
}

fn variant_from_config(config: &VariantConfig) -> Option<Variant> {
    let mut variant = Variant::new(config.id.clone()).status(config.status);
    if let Some(label) = &config.label {
        variant = variant.label(label.clone());
    }
    for (name, value) in &config.headers {
        variant = variant.header(name.clone(), value.clone());
    }
    if let Some(body) = &config.body {
        variant = variant.json(body.clone());
    } else if let Some(text) = &config.text {
        variant = variant.text(text.clone());
    }
    if let Some(when) = &config.when {
        variant = variant.when(predicate_from_config(when)?);
    }
    if config.default {
        variant = variant.as_default();
    }
    Some(variant)
}

/// `None` unless exactly one of `state`, `input`, `meta` is set.
pub(crate) fn predicate_from_config(config: &PredicateConfig) -> Option<Predicate> {
    let value = config.equals.clone();
    match (&config.state, &config.input, &config.meta) {
        (Some(key), None, None) => Some(Predicate::StateEquals { key: key.clone(), value }),
        (None, Some(key), None) => Some(Predicate::InputEquals { key: key.clone(), value }),
        (None, None, Some(key)) => Some(Predicate::MetaEquals { key: key.clone(), value }),
        _ => None,
    }
}
