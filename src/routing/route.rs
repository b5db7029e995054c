//! Route definitions.

use std::collections::BTreeMap;

use axum::http::Method;
use serde_json::Value;

use crate::engine::context::ExecutionContext;
use crate::engine::types::HandlerResult;
use crate::plugins::input::InputField;
use crate::routing::matcher::PathPattern;
use crate::routing::variant::Variant;
use crate::state::StateMap;

/// Declaration of a route before registration.
#[derive(Debug, Clone, Default)]
pub struct RouteSpec {
    pub id: Option<String>,
    pub path: Option<String>,
    pub method: Option<Method>,
    pub label: Option<String>,
    pub meta: StateMap,
    pub input: BTreeMap<String, InputField>,
}

impl RouteSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A declared endpoint owning its variants.
#[derive(Debug, Clone)]
pub struct Route {
    id: String,
    explicit_id: bool,
    pattern: PathPattern,
    method: Option<Method>,
    label: Option<String>,
    meta: StateMap,
    input: BTreeMap<String, InputField>,
    variants: Vec<Variant>,
}

impl Route {
    /// Build a route from its spec. `path` must already be known to exist.
    pub(crate) fn from_spec(spec: RouteSpec, path: String) -> Self {
        let explicit_id = spec.id.is_some();
        let mut route = Self {
            id: spec.id.unwrap_or_default(),
            explicit_id,
            pattern: PathPattern::parse(&path),
            method: spec.method,
            label: spec.label,
            meta: spec.meta,
            input: spec.input,
            variants: Vec::new(),
        };
        route.refresh_id();
        route
    }

    /// Routes without an explicit id are keyed by method and path.
    fn refresh_id(&mut self) {
        if self.explicit_id {
            return;
        }
        self.id = match &self.method {
            Some(method) => format!("{} {}", method, self.pattern.as_str()),
            None => self.pattern.as_str().to_string(),
        };
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub(crate) fn set_method(&mut self, method: Method) {
        self.method = Some(method);
        self.refresh_id();
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = Some(label);
    }

    pub fn meta(&self) -> &StateMap {
        &self.meta
    }

    pub fn meta_value(&self, id: &str) -> Option<&Value> {
        self.meta.get(id)
    }

    pub(crate) fn set_meta(&mut self, id: String, value: Value) {
        self.meta.insert(id, value);
    }

    /// Declared route inputs.
    pub fn input(&self) -> &BTreeMap<String, InputField> {
        &self.input
    }

    pub(crate) fn set_input(&mut self, id: String, field: InputField) {
        self.input.insert(id, field);
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id() == id)
    }

    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    pub(crate) fn push_variant(&mut self, variant: Variant) -> &Variant {
        self.variants.push(variant);
        &self.variants[self.variants.len() - 1]
    }

    /// The variant flagged default, else the first one without a predicate.
    pub fn default_variant(&self) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.is_default())
            .or_else(|| self.variants.iter().find(|v| v.predicate().is_none()))
    }

    /// Pick the variant answering for the session behind `ctx`.
    ///
    /// Precedence: pinned variant, then the first variant whose predicate
    /// holds in declaration order, then the default variant. A pinned id
    /// that names no variant is ignored.
    pub fn resolve_active(
        &self,
        ctx: &ExecutionContext<'_>,
        pinned: Option<&str>,
    ) -> HandlerResult<Option<&Variant>> {
        if let Some(id) = pinned {
            match self.variant(id) {
                Some(variant) => return Ok(Some(variant)),
                None => {
                    tracing::warn!(route = %self.id, variant = %id, "Pinned variant no longer exists");
                }
            }
        }

        for variant in &self.variants {
            if variant.is_activated(ctx)? {
                return Ok(Some(variant));
            }
        }

        Ok(self.default_variant())
    }

    /// True when this route answers `method`.
    pub fn accepts(&self, method: &Method) -> bool {
        match &self.method {
            Some(expected) => expected == method || (*expected == Method::GET && *method == Method::HEAD),
            None => true,
        }
    }
}
