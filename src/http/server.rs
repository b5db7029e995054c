//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the mock dispatch handler
//! - Hand sessions that selected an upstream to the proxy forwarder
//! - Nest the admin API under its prefix
//! - Wire up middleware (tracing, body limit)
//! - Bind server to listener and stop on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::MockConfig;
use crate::engine::Engine;
use crate::plugins::proxy::ProxyTargets;
use crate::http::proxy::Forwarder;
use crate::http::request::request_data;
use crate::http::response::error_response;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Bearer key guarding the admin API; `None` leaves it open.
    pub api_key: Option<Arc<str>>,
    /// Upstream forwarding; `None` when no proxy targets are configured.
    pub proxy: Option<Arc<Forwarder>>,
}

/// HTTP server for the mock engine.
pub struct HttpServer {
    router: Router,
    engine: Arc<Engine>,
}

impl HttpServer {
    /// Create a new HTTP server serving `engine`.
    pub fn new(engine: Arc<Engine>, config: &MockConfig) -> Self {
        let state = AppState {
            engine: engine.clone(),
            api_key: config.admin.api_key.as_deref().map(Arc::from),
            proxy: Self::build_forwarder(config).map(Arc::new),
        };
        let router = Self::build_router(config, state);
        Self { router, engine }
    }

    fn build_forwarder(config: &MockConfig) -> Option<Forwarder> {
        if !config.proxy.enabled || config.proxy.targets.is_empty() {
            return None;
        }
        let targets = match ProxyTargets::parse(&config.proxy.targets) {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(error = %e, "Proxy disabled");
                return None;
            }
        };
        match Forwarder::new(targets, Duration::from_secs(config.proxy.timeout_secs)) {
            Ok(forwarder) => Some(forwarder),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build proxy client");
                None
            }
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &MockConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", any(mock_handler))
            .route("/{*path}", any(mock_handler))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.nest(&config.admin.prefix, setup_admin_router(state));
            tracing::info!(prefix = %config.admin.prefix, "Admin API enabled");
        }

        router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(config.listener.max_body_size)),
        )
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, engine = %self.engine.id(), "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Mock dispatch: match a route, identify the session, then proxy or
/// render its active variant.
///
/// Unmatched requests never create a session.
async fn mock_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let engine = &state.engine;
    let Some(found) = engine.find_route(&method, uri.path()) else {
        tracing::debug!(method = %method, path = %uri.path(), "No mock route matched");
        return error_response(StatusCode::NOT_FOUND, "No mock route matches this request");
    };

    let backend = engine.backend();
    let lookup = backend.session_id(&headers);
    engine.initialize_session(&lookup.id);

    let upstream = state
        .proxy
        .as_deref()
        .and_then(|proxy| Some((proxy, proxy.targets().selected(engine, &lookup.id)?)));

    let mut response = match upstream {
        Some((proxy, (target, base))) => {
            tracing::debug!(session = %lookup.id, route = %found.route.id(), target = %target, "Route proxied");
            proxy.forward(base, &method, &uri, &headers, body).await
        }
        None => {
            let data = request_data(&method, &uri, &headers, &body, found.params);
            match engine.respond(&lookup.id, found.route, &data) {
                Ok(Some(mock)) => mock.into_response(),
                Ok(None) => error_response(StatusCode::NOT_FOUND, "Route has no variant to serve"),
                Err(e) => {
                    tracing::error!(session = %lookup.id, route = %found.route.id(), error = %e, "Mock handler failed");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
            }
        }
    };

    backend.persist(&lookup, response.headers_mut());
    response
}
