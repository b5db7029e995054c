//! Plugin definitions and registry.

use std::collections::BTreeMap;
use std::fmt;

use crate::engine::builder::EngineBuilder;
use crate::engine::types::ConfigError;
use crate::plugins::input::InputField;
use crate::state::{PluginState, StateMap};

/// One-shot setup hook run when the plugin is registered.
pub type SetupHook = Box<dyn FnOnce(&mut EngineBuilder) -> Result<(), ConfigError> + Send>;

/// Declaration of a plugin before registration.
pub struct PluginSpec {
    pub id: String,
    pub label: Option<String>,
    pub input: BTreeMap<String, InputField>,
    pub setup: Option<SetupHook>,
}

impl PluginSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            input: BTreeMap::new(),
            setup: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn input(mut self, id: impl Into<String>, field: InputField) -> Self {
        self.input.insert(id.into(), field);
        self
    }

    pub fn setup<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut EngineBuilder) -> Result<(), ConfigError> + Send + 'static,
    {
        self.setup = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSpec")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("input", &self.input)
            .field("setup", &self.setup.is_some())
            .finish()
    }
}

/// A registered plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    id: String,
    label: Option<String>,
    input: BTreeMap<String, InputField>,
}

impl Plugin {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn input(&self) -> &BTreeMap<String, InputField> {
        &self.input
    }
}

/// All registered plugins, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the declarative part of a spec; the setup hook is handed back
    /// so the caller can run it with the engine under construction.
    pub(crate) fn insert(&mut self, spec: PluginSpec) -> Option<SetupHook> {
        let PluginSpec { id, label, input, setup } = spec;
        self.plugins.push(Plugin { id, label, input });
        setup
    }

    pub fn get(&self, id: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.id == id)
    }

    pub fn all(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Fresh plugin state holding every declared input at its default.
    ///
    /// Plugins without inputs get no entry.
    pub fn defaults(&self) -> PluginState {
        self.plugins
            .iter()
            .filter(|p| !p.input.is_empty())
            .map(|p| {
                let values: StateMap = p
                    .input
                    .iter()
                    .map(|(id, field)| (id.clone(), field.default_value.clone()))
                    .collect();
                (p.id.clone(), values)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_skip_plugins_without_input() {
        let mut registry = PluginRegistry::new();
        registry.insert(PluginSpec::new("p1").input("x", InputField::text("A")));
        registry.insert(PluginSpec::new("bare"));

        let defaults = registry.defaults();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults["p1"]["x"], json!("A"));
    }

    #[test]
    fn test_insert_returns_hook() {
        let mut registry = PluginRegistry::new();
        let hook = registry.insert(PluginSpec::new("p1").setup(|_| Ok(())));
        assert!(hook.is_some());
        assert!(registry.get("p1").is_some());
        assert!(registry.get("p2").is_none());
    }
}
