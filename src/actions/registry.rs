//! Action definitions and registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::engine::context::ExecutionContext;
use crate::engine::types::HandlerResult;
use crate::plugins::input::InputField;

/// Handler invoked with the execution context and a mutable input value.
pub type ActionHandler =
    Arc<dyn Fn(&ExecutionContext<'_>, &mut Value) -> HandlerResult<()> + Send + Sync>;

/// A named out-of-band handler.
#[derive(Clone)]
pub struct Action {
    id: String,
    label: Option<String>,
    route: Option<String>,
    plugin: Option<String>,
    input: BTreeMap<String, InputField>,
    handler: ActionHandler,
}

impl Action {
    pub fn new<F>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ExecutionContext<'_>, &mut Value) -> HandlerResult<()> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            label: None,
            route: None,
            plugin: None,
            input: BTreeMap::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Bind the handler's context to a route.
    pub fn for_route(mut self, route_id: impl Into<String>) -> Self {
        self.route = Some(route_id.into());
        self
    }

    /// Bind the handler's context to a plugin's input.
    pub fn for_plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin = Some(plugin_id.into());
        self
    }

    /// Declare an input field for admin front-ends.
    pub fn input(mut self, id: impl Into<String>, field: InputField) -> Self {
        self.input.insert(id.into(), field);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn route_id(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn plugin_id(&self) -> Option<&str> {
        self.plugin.as_deref()
    }

    pub fn input_fields(&self) -> &BTreeMap<String, InputField> {
        &self.input
    }

    pub(crate) fn invoke(&self, ctx: &ExecutionContext<'_>, input: &mut Value) -> HandlerResult<()> {
        (self.handler)(ctx, input)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

/// Registered actions.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under its own id, replacing any previous one.
    pub fn register(&mut self, action: Action) -> &mut Self {
        self.actions.insert(action.id.clone(), action);
        self
    }

    /// Register an action under `id`, overriding the id it carries.
    pub fn register_as(&mut self, id: impl Into<String>, mut action: Action) -> &mut Self {
        action.id = id.into();
        self.register(action)
    }

    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn all(&self) -> &BTreeMap<String, Action> {
        &self.actions
    }
}
