//! Admin API subsystem.
//!
//! # Data Flow
//! ```text
//! {prefix}/... request
//!     → auth.rs (bearer key, when configured)
//!     → handlers.rs
//!           session from the configured state backend
//!           → engine data operation (select, input, profile, action, reset)
//!           → SessionSnapshot as JSON
//! ```
//!
//! # Design Decisions
//! - Every mutation answers with the full session snapshot
//! - The admin API acts on the caller's own session, identified the same
//!   way mock requests are
//! - Unknown ids are 404; user handler errors are 500 with their message

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

/// Admin routes, relative to the configured prefix.
pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/state", get(get_state))
        .route("/global/input/{plugin}", post(update_plugin_input))
        .route("/route/{route}", post(update_route))
        .route("/profile/{profile}", post(apply_profile))
        .route("/action/{action}", post(execute_action))
        .route("/reset", post(reset_session))
        .route("/har/{id}", get(get_har_call))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
