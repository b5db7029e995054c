//! Serializable view of the engine as one session sees it.
//!
//! Returned by every admin mutation so front-ends can redraw in one round
//! trip.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::engine::types::HandlerResult;
use crate::engine::Engine;
use crate::plugins::input::InputField;
use crate::state::SessionId;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub session: String,
    pub routes: Vec<RouteSnapshot>,
    pub plugins: Vec<PluginSnapshot>,
    pub profiles: Vec<String>,
    pub actions: Vec<ActionSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSnapshot {
    pub id: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub active_variant: Option<String>,
    pub selected_variant: Option<String>,
    pub variants: Vec<VariantSummary>,
    pub input: BTreeMap<String, InputSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub status: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputSnapshot {
    #[serde(flatten)]
    pub field: InputField,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginSnapshot {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub input: BTreeMap<String, InputSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionSnapshot {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    pub input: BTreeMap<String, InputField>,
}

impl SessionSnapshot {
    /// Resolving active variants runs predicates, so this can fail with
    /// whatever a predicate returns.
    pub fn capture(engine: &Engine, session: &SessionId) -> HandlerResult<Self> {
        let routes = engine.routes();
        let plugins = engine.plugins();

        let mut route_snapshots = Vec::with_capacity(routes.all().len());
        for route in routes.all() {
            let active = routes.peek(route, session)?;
            let input = route
                .input()
                .iter()
                .map(|(id, field)| {
                    let value = routes.input_value(route.id(), id, session);
                    (id.clone(), InputSnapshot { field: field.clone(), value })
                })
                .collect();

            route_snapshots.push(RouteSnapshot {
                id: route.id().to_string(),
                path: route.path().to_string(),
                method: route.method().map(ToString::to_string),
                label: route.label().map(str::to_string),
                active_variant: active.map(|v| v.id().to_string()),
                selected_variant: engine.state().selected_variant(session, route.id()),
                variants: route
                    .variants()
                    .iter()
                    .map(|v| VariantSummary {
                        id: v.id().to_string(),
                        label: v.label_text().map(str::to_string),
                        status: v.status_code(),
                    })
                    .collect(),
                input,
            });
        }

        let plugin_snapshots = plugins
            .all()
            .iter()
            .map(|plugin| PluginSnapshot {
                id: plugin.id().to_string(),
                label: plugin.label().map(str::to_string),
                input: plugin
                    .input()
                    .iter()
                    .map(|(id, field)| {
                        let value = plugins.get_input_value(plugin.id(), id, session);
                        (id.clone(), InputSnapshot { field: field.clone(), value })
                    })
                    .collect(),
            })
            .collect();

        let action_snapshots = engine
            .actions()
            .all()
            .values()
            .map(|action| ActionSnapshot {
                id: action.id().to_string(),
                label: action.label_text().map(str::to_string),
                route: action.route_id().map(str::to_string),
                plugin: action.plugin_id().map(str::to_string),
                input: action.input_fields().clone(),
            })
            .collect();

        Ok(Self {
            id: engine.id().to_string(),
            session: session.to_string(),
            routes: route_snapshots,
            plugins: plugin_snapshots,
            profiles: engine.profiles().all().keys().cloned().collect(),
            actions: action_snapshots,
        })
    }
}
