//! Session identification strategies.
//!
//! # Strategies
//! - `Static`: every request shares one fixed session
//! - `Header`: the session id is read from a fixed request header
//! - `Cookie`: the session id is read from a cookie and minted when absent
//!
//! # Design Decisions
//! - Closed set selected by configuration; no dynamic handler objects
//! - Every strategy offers the same three capabilities: initialize,
//!   session id lookup, persist-if-needed
//! - Only the cookie strategy ever writes to the response

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use uuid::Uuid;

use crate::config::schema::{StateBackendKind, StateConfig};
use crate::engine::Engine;
use crate::state::session::SessionId;

/// Session id the `Static` strategy and missing headers fall back to.
pub const DEFAULT_SESSION: &str = "default";

/// Result of identifying the session behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLookup {
    pub id: SessionId,
    /// True when the id was minted for this request and must be persisted.
    pub minted: bool,
}

/// Where the session identifier comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateBackend {
    Static { session: SessionId },
    Header { name: String },
    Cookie { name: String },
}

impl Default for StateBackend {
    fn default() -> Self {
        StateBackend::Static {
            session: SessionId::from(DEFAULT_SESSION),
        }
    }
}

impl StateBackend {
    /// Build the strategy named by the `[state]` section.
    pub fn from_config(config: &StateConfig) -> Self {
        match config.backend {
            StateBackendKind::Static => StateBackend::Static {
                session: SessionId::new(config.static_session.clone()),
            },
            StateBackendKind::Header => StateBackend::Header {
                name: config.header_name.to_ascii_lowercase(),
            },
            StateBackendKind::Cookie => StateBackend::Cookie {
                name: config.cookie_name.clone(),
            },
        }
    }

    /// One-time setup once the engine is frozen.
    ///
    /// The static strategy seeds its only session up front so that plugin
    /// input defaults are in place before the first request.
    pub fn initialize(&self, engine: &Engine) {
        match self {
            StateBackend::Static { session } => {
                engine.initialize_session(session);
                tracing::info!(session = %session, "Static session initialized");
            }
            StateBackend::Header { name } => {
                tracing::info!(header = %name, "Sessions keyed by request header");
            }
            StateBackend::Cookie { name } => {
                tracing::info!(cookie = %name, "Sessions keyed by cookie");
            }
        }
    }

    /// Identify the session behind a request.
    pub fn session_id(&self, headers: &HeaderMap) -> SessionLookup {
        match self {
            StateBackend::Static { session } => SessionLookup {
                id: session.clone(),
                minted: false,
            },
            StateBackend::Header { name } => {
                let id = headers
                    .get(name.as_str())
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .unwrap_or(DEFAULT_SESSION);
                SessionLookup {
                    id: SessionId::from(id),
                    minted: false,
                }
            }
            StateBackend::Cookie { name } => match read_cookie(headers, name) {
                Some(id) => SessionLookup {
                    id: SessionId::new(id),
                    minted: false,
                },
                None => SessionLookup {
                    id: SessionId::new(Uuid::new_v4().to_string()),
                    minted: true,
                },
            },
        }
    }

    /// Attach whatever the client needs to present the same session again.
    pub fn persist(&self, lookup: &SessionLookup, response_headers: &mut HeaderMap) {
        let StateBackend::Cookie { name } = self else {
            return;
        };
        if !lookup.minted {
            return;
        }
        let cookie = format!("{}={}; Path=/; HttpOnly", name, lookup.id);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response_headers.append(SET_COOKIE, value);
            }
            Err(e) => {
                tracing::warn!(session = %lookup.id, error = %e, "Could not encode session cookie");
            }
        }
    }
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_backend() {
        let backend = StateBackend::default();
        let lookup = backend.session_id(&HeaderMap::new());
        assert_eq!(lookup.id.as_str(), DEFAULT_SESSION);
        assert!(!lookup.minted);
    }

    #[test]
    fn test_header_backend() {
        let backend = StateBackend::Header { name: "x-session-id".into() };
        let mut headers = HeaderMap::new();
        headers.insert("X-Session-Id", HeaderValue::from_static("alice"));

        assert_eq!(backend.session_id(&headers).id.as_str(), "alice");
        assert_eq!(backend.session_id(&HeaderMap::new()).id.as_str(), DEFAULT_SESSION);
    }

    #[test]
    fn test_cookie_backend_reads_existing_cookie() {
        let backend = StateBackend::Cookie { name: "smocks".into() };
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; smocks=abc123"));

        let lookup = backend.session_id(&headers);
        assert_eq!(lookup.id.as_str(), "abc123");
        assert!(!lookup.minted);

        let mut response = HeaderMap::new();
        backend.persist(&lookup, &mut response);
        assert!(response.get(SET_COOKIE).is_none());
    }

    #[test]
    fn test_cookie_backend_mints_and_persists() {
        let backend = StateBackend::Cookie { name: "smocks".into() };
        let lookup = backend.session_id(&HeaderMap::new());
        assert!(lookup.minted);

        let mut response = HeaderMap::new();
        backend.persist(&lookup, &mut response);
        let cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("smocks={}", lookup.id)));
    }
}
