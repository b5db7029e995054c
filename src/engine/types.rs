//! Engine error definitions.

use thiserror::Error;

/// Error raised by user code: predicates, action handlers, response builders.
///
/// The engine passes these through untouched.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for operations that may run user code.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Fatal, startup-time configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A route was declared without a path.
    #[error("Routes must be declared with a path")]
    MissingPath,

    /// One or more semantic problems, all reported at once.
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    /// A plugin setup hook refused to initialize.
    #[error("Plugin \"{plugin}\" setup failed: {reason}")]
    Plugin { plugin: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A single semantic problem found while validating configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duplicate route key \"{0}\"")]
    DuplicateRoute(String),

    #[error("duplicate variant key \"{variant}\" for route \"{route}\"")]
    DuplicateVariant { route: String, variant: String },

    #[error("route \"{0}\" has no variants")]
    NoVariants(String),

    #[error("route \"{0}\" has no default variant")]
    NoDefaultVariant(String),

    #[error("route \"{0}\" declares more than one default variant")]
    MultipleDefaults(String),

    #[error("route \"{route}\" has invalid method \"{method}\"")]
    InvalidMethod { route: String, method: String },

    #[error("profile \"{profile}\" references unknown route \"{route}\"")]
    UnknownProfileRoute { profile: String, route: String },

    #[error("profile \"{profile}\" selects unknown variant \"{variant}\" of route \"{route}\"")]
    UnknownProfileVariant {
        profile: String,
        route: String,
        variant: String,
    },

    #[error("action \"{action}\" is bound to unknown route or plugin \"{target}\"")]
    UnknownActionBinding { action: String, target: String },

    #[error("variant \"{variant}\" of route \"{route}\" needs exactly one of state, input or meta in its predicate")]
    InvalidPredicate { route: String, variant: String },

    #[error("route #{0} has no path")]
    MissingRoutePath(usize),

    #[error("path \"{0}\" must start with '/'")]
    InvalidPath(String),

    #[error("{0} declared with an empty id")]
    EmptyId(&'static str),

    #[error("state backend: {0}")]
    InvalidStateBackend(String),

    #[error("proxy target \"{0}\" must be an http or https URL")]
    InvalidProxyTarget(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
