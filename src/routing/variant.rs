//! Response variants.
//!
//! # Responsibilities
//! - Hold one candidate response for a route
//! - Evaluate the optional activation predicate
//! - Render the response, either static or via a builder closure
//!
//! # Design Decisions
//! - Predicates and builders only ever see an [`ExecutionContext`]
//! - Errors from user closures are returned as-is
//! - Declarative predicates cover config files; closures cover code

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::engine::context::ExecutionContext;
use crate::engine::types::HandlerResult;
use crate::routing::request::{MockBody, MockResponse, RequestData};

/// Predicate closure over the execution context.
pub type PredicateFn = Arc<dyn Fn(&ExecutionContext<'_>) -> HandlerResult<bool> + Send + Sync>;

/// Response builder closure.
pub type ResponseFn =
    Arc<dyn Fn(&ExecutionContext<'_>, &RequestData) -> HandlerResult<MockResponse> + Send + Sync>;

/// Activation predicate of a variant.
#[derive(Clone)]
pub enum Predicate {
    /// User state in the context's scope equals `value`.
    StateEquals { key: String, value: Value },
    /// Input visible to the context equals `value`.
    InputEquals { key: String, value: Value },
    /// Static route metadata equals `value`.
    MetaEquals { key: String, value: Value },
    Custom(PredicateFn),
}

impl Predicate {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&ExecutionContext<'_>) -> HandlerResult<bool> + Send + Sync + 'static,
    {
        Predicate::Custom(Arc::new(f))
    }

    pub fn evaluate(&self, ctx: &ExecutionContext<'_>) -> HandlerResult<bool> {
        match self {
            Predicate::StateEquals { key, value } => Ok(ctx.state(key).as_ref() == Some(value)),
            Predicate::InputEquals { key, value } => Ok(ctx.input(key).as_ref() == Some(value)),
            Predicate::MetaEquals { key, value } => Ok(ctx.meta(key) == Some(value)),
            Predicate::Custom(f) => f(ctx),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::StateEquals { key, value } => write!(f, "state({key}) == {value}"),
            Predicate::InputEquals { key, value } => write!(f, "input({key}) == {value}"),
            Predicate::MetaEquals { key, value } => write!(f, "meta({key}) == {value}"),
            Predicate::Custom(_) => f.write_str("custom"),
        }
    }
}

/// Body declared on a variant.
#[derive(Clone, Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Builder(ResponseFn),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Json(v) => f.debug_tuple("Json").field(v).finish(),
            ResponseBody::Text(t) => f.debug_tuple("Text").field(t).finish(),
            ResponseBody::Builder(_) => f.write_str("Builder"),
        }
    }
}

/// One candidate response of a route.
#[derive(Debug, Clone)]
pub struct Variant {
    id: String,
    label: Option<String>,
    status: u16,
    headers: BTreeMap<String, String>,
    body: ResponseBody,
    predicate: Option<Predicate>,
    default: bool,
}

impl Variant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            status: 200,
            headers: BTreeMap::new(),
            body: ResponseBody::Empty,
            predicate: None,
            default: false,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = ResponseBody::Json(body);
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = ResponseBody::Text(body.into());
        self
    }

    /// Produce the response at request time instead of declaring it.
    pub fn respond_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&ExecutionContext<'_>, &RequestData) -> HandlerResult<MockResponse> + Send + Sync + 'static,
    {
        self.body = ResponseBody::Builder(Arc::new(f));
        self
    }

    pub fn when(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Shorthand for a closure predicate.
    pub fn when_fn<F>(self, f: F) -> Self
    where
        F: Fn(&ExecutionContext<'_>) -> HandlerResult<bool> + Send + Sync + 'static,
    {
        self.when(Predicate::custom(f))
    }

    /// Mark this variant as the route's fallback.
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// True when the variant declares a predicate and it holds.
    pub fn is_activated(&self, ctx: &ExecutionContext<'_>) -> HandlerResult<bool> {
        match &self.predicate {
            Some(predicate) => predicate.evaluate(ctx),
            None => Ok(false),
        }
    }

    /// Build the response for `request`.
    pub fn render(&self, ctx: &ExecutionContext<'_>, request: &RequestData) -> HandlerResult<MockResponse> {
        let mut response = match &self.body {
            ResponseBody::Builder(f) => return f(ctx, request),
            ResponseBody::Empty => MockResponse::empty(self.status),
            ResponseBody::Json(v) => MockResponse::json(self.status, v.clone()),
            ResponseBody::Text(t) => MockResponse {
                status: self.status,
                headers: Vec::new(),
                body: MockBody::Text(t.clone()),
            },
        };
        response.headers = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(response)
    }
}
