//! Declared input fields shared by plugins, routes and actions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape of an input value, used by admin front-ends to pick a widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    Text,
    Number,
    Boolean,
    Select,
    Json,
}

/// One declared input: its default value and shape.
///
/// The engine does not type-check values written to an input.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct InputField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub kind: InputKind,

    #[serde(default, rename = "default")]
    pub default_value: Value,

    /// Allowed values for `select` inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
}

impl InputField {
    pub fn new(kind: InputKind, default_value: impl Into<Value>) -> Self {
        Self {
            label: None,
            kind,
            default_value: default_value.into(),
            options: Vec::new(),
        }
    }

    pub fn text(default_value: impl Into<String>) -> Self {
        Self::new(InputKind::Text, Value::String(default_value.into()))
    }

    pub fn boolean(default_value: bool) -> Self {
        Self::new(InputKind::Boolean, Value::Bool(default_value))
    }

    pub fn number(default_value: impl Into<serde_json::Number>) -> Self {
        Self::new(InputKind::Number, Value::Number(default_value.into()))
    }

    pub fn select(default_value: impl Into<Value>, options: Vec<Value>) -> Self {
        Self {
            options,
            ..Self::new(InputKind::Select, default_value)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
