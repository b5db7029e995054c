//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every route has a path starting with '/'
//! - Ids are non-empty
//! - Declarative predicates name exactly one source
//! - State backend, session limits, proxy targets and admin settings are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MockConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use reqwest::Url;

use crate::config::schema::{MockConfig, PredicateConfig, StateBackendKind};
use crate::engine::types::ValidationError;

pub fn validate_config(config: &MockConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, route) in config.routes.iter().enumerate() {
        let Some(path) = &route.path else {
            errors.push(ValidationError::MissingRoutePath(index));
            continue;
        };
        if !path.starts_with('/') {
            errors.push(ValidationError::InvalidPath(path.clone()));
        }
        if route.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            errors.push(ValidationError::EmptyId("route"));
        }

        let route_name = route.id.clone().unwrap_or_else(|| path.clone());
        for variant in &route.variants {
            if variant.id.trim().is_empty() {
                errors.push(ValidationError::EmptyId("variant"));
            }
            if variant.when.as_ref().is_some_and(|when| !single_source(when)) {
                errors.push(ValidationError::InvalidPredicate {
                    route: route_name.clone(),
                    variant: variant.id.clone(),
                });
            }
        }
    }

    for plugin in &config.plugins {
        if plugin.id.trim().is_empty() {
            errors.push(ValidationError::EmptyId("plugin"));
        }
    }

    for id in config.profiles.keys() {
        if id.trim().is_empty() {
            errors.push(ValidationError::EmptyId("profile"));
        }
    }

    let state = &config.state;
    match state.backend {
        StateBackendKind::Cookie if !is_token(&state.cookie_name) => {
            errors.push(ValidationError::InvalidStateBackend(format!(
                "invalid cookie name \"{}\"",
                state.cookie_name
            )));
        }
        StateBackendKind::Header if !is_token(&state.header_name) => {
            errors.push(ValidationError::InvalidStateBackend(format!(
                "invalid header name \"{}\"",
                state.header_name
            )));
        }
        StateBackendKind::Static if state.static_session.trim().is_empty() => {
            errors.push(ValidationError::EmptyId("static session"));
        }
        _ => {}
    }
    if state.session_ttl_secs > 0 && state.sweep_interval_secs == 0 {
        errors.push(ValidationError::InvalidStateBackend(
            "sweep_interval_secs must be positive when session_ttl_secs is set".to_string(),
        ));
    }

    if config.proxy.enabled {
        for (name, url) in &config.proxy.targets {
            let valid = Url::parse(url).is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
            if !valid {
                errors.push(ValidationError::InvalidProxyTarget(name.clone()));
            }
        }
    }

    if config.admin.enabled && (!config.admin.prefix.starts_with('/') || config.admin.prefix.ends_with('/')) {
        errors.push(ValidationError::InvalidPath(config.admin.prefix.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn single_source(when: &PredicateConfig) -> bool {
    [&when.state, &when.input, &when.meta]
        .iter()
        .filter(|source| source.is_some())
        .count()
        == 1
}

/// RFC 7230 token characters, which covers both header and cookie names.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
