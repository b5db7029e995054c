use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::engine::HandlerError;
use crate::http::response::error_response;
use crate::http::server::AppState;
use crate::plugins::har::find_call;
use crate::state::SessionLookup;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Handler(HandlerError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdminError::Handler(e) => {
                tracing::error!(error = %e, "Admin operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self.to_string())
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub id: String,
    pub version: &'static str,
    pub sessions: usize,
    pub routes: usize,
    pub plugins: usize,
    pub profiles: usize,
    pub actions: usize,
}

/// Body of `POST route/{route}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RouteUpdate {
    /// Variant to pin for the session.
    pub variant: Option<String>,
    /// Drop the pinned variant before anything else.
    pub clear: bool,
    pub input: BTreeMap<String, Value>,
}

/// Body of `POST global/input/{plugin}`.
///
/// Either one `{"id": input, "value": v}` pair or a map of input → value.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PluginInputUpdate {
    Single { id: String, value: Value },
    Many(BTreeMap<String, Value>),
}

impl PluginInputUpdate {
    pub fn into_values(self) -> BTreeMap<String, Value> {
        match self {
            PluginInputUpdate::Single { id, value } => BTreeMap::from([(id, value)]),
            PluginInputUpdate::Many(values) => values,
        }
    }
}

/// Identify the caller's session, creating it on first sight.
fn session(state: &AppState, headers: &HeaderMap) -> SessionLookup {
    let lookup = state.engine.backend().session_id(headers);
    state.engine.initialize_session(&lookup.id);
    lookup
}

fn snapshot_response(state: &AppState, lookup: &SessionLookup) -> Result<Response, AdminError> {
    let snapshot = state.engine.snapshot(&lookup.id).map_err(AdminError::Handler)?;
    let mut response = Json(snapshot).into_response();
    state.engine.backend().persist(lookup, response.headers_mut());
    Ok(response)
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let engine = &state.engine;
    Json(SystemStatus {
        id: engine.id().to_string(),
        version: env!("CARGO_PKG_VERSION"),
        sessions: engine.state().len(),
        routes: engine.routes().all().len(),
        plugins: engine.plugins().all().len(),
        profiles: engine.profiles().all().len(),
        actions: engine.actions().all().len(),
    })
}

pub async fn get_state(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AdminError> {
    let lookup = session(&state, &headers);
    snapshot_response(&state, &lookup)
}

pub async fn update_plugin_input(
    State(state): State<AppState>,
    Path(plugin): Path<String>,
    headers: HeaderMap,
    Json(update): Json<PluginInputUpdate>,
) -> Result<Response, AdminError> {
    let plugins = state.engine.plugins();
    let Some(declared) = plugins.get(&plugin) else {
        return Err(AdminError::NotFound(format!("unknown plugin \"{plugin}\"")));
    };

    let values = update.into_values();
    if let Some(unknown) = values.keys().find(|input| !declared.input().contains_key(*input)) {
        return Err(AdminError::BadRequest(format!(
            "plugin \"{plugin}\" declares no input \"{unknown}\""
        )));
    }

    let lookup = session(&state, &headers);
    for (input, value) in values {
        plugins.update_input(&plugin, &input, value, &lookup.id);
    }
    snapshot_response(&state, &lookup)
}

pub async fn update_route(
    State(state): State<AppState>,
    Path(route): Path<String>,
    headers: HeaderMap,
    Json(update): Json<RouteUpdate>,
) -> Result<Response, AdminError> {
    let routes = state.engine.routes();
    if routes.get(&route).is_none() {
        return Err(AdminError::NotFound(format!("unknown route \"{route}\"")));
    }

    let lookup = session(&state, &headers);
    if update.clear {
        routes.clear_selection(&route, &lookup.id);
    }
    if let Some(variant) = &update.variant {
        if !routes.select_variant(&route, variant, &lookup.id) {
            return Err(AdminError::NotFound(format!(
                "unknown variant \"{variant}\" for route \"{route}\""
            )));
        }
    }
    for (input, value) in update.input {
        routes.update_input(&route, &input, value, &lookup.id);
    }
    snapshot_response(&state, &lookup)
}

pub async fn apply_profile(
    State(state): State<AppState>,
    Path(profile): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AdminError> {
    let lookup = session(&state, &headers);
    if !state.engine.profiles().apply(profile.as_str(), &lookup.id) {
        return Err(AdminError::NotFound(format!("unknown profile \"{profile}\"")));
    }
    snapshot_response(&state, &lookup)
}

pub async fn execute_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AdminError> {
    let input = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| AdminError::BadRequest(format!("invalid action input: {e}")))?
    };

    let lookup = session(&state, &headers);
    let executed = state
        .engine
        .actions()
        .execute(&action, input, &lookup.id)
        .map_err(AdminError::Handler)?;
    if !executed {
        return Err(AdminError::NotFound(format!("unknown action \"{action}\"")));
    }
    snapshot_response(&state, &lookup)
}

pub async fn reset_session(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AdminError> {
    let lookup = session(&state, &headers);
    state.engine.state().reset_route_state(&lookup.id);
    state.engine.plugins().reset_input(&lookup.id);
    tracing::info!(session = %lookup.id, "Session reset");
    snapshot_response(&state, &lookup)
}

/// Replay a recorded call from the session's loaded HAR archive.
pub async fn get_har_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AdminError> {
    let lookup = session(&state, &headers);
    let Some((status, body)) = find_call(&state.engine.context(&lookup.id), &id) else {
        return Err(AdminError::NotFound(format!("no recorded call \"{id}\"")));
    };

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    let mut response = (status, Json(body)).into_response();
    state.engine.backend().persist(&lookup, response.headers_mut());
    Ok(response)
}
