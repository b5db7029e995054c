//! Transport-neutral request and response values.
//!
//! The HTTP layer converts wire requests into [`RequestData`] and renders
//! [`MockResponse`] back; the engine never sees wire types.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// What a response builder may know about the inbound request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestData {
    pub method: String,
    pub path: String,
    /// Values captured by `{param}` segments of the route path.
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    /// Lower-cased header names.
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON payload, or the raw text as a string value.
    pub payload: Option<Value>,
}

impl RequestData {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A top-level field of a JSON object payload.
    pub fn payload_field(&self, name: &str) -> Option<&Value> {
        self.payload.as_ref()?.get(name)
    }
}

/// Rendered body of a mock response.
#[derive(Debug, Clone, PartialEq)]
pub enum MockBody {
    Empty,
    Json(Value),
    Text(String),
}

/// A fully resolved response, ready for the transport to write.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: MockBody,
}

impl MockResponse {
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: MockBody::Empty,
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: MockBody::Json(body),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: MockBody::Text(body.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
