//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define engine metrics
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `smocks_resolutions_total` (counter): variant resolutions by route, variant
//! - `smocks_profile_applications_total` (counter): by profile, outcome
//! - `smocks_action_executions_total` (counter): by action, outcome
//! - `smocks_plugin_input_updates_total` (counter): by plugin
//! - `smocks_sessions` (gauge): sessions held in memory
//!
//! # Design Decisions
//! - Labels come from configuration ids only; caller-supplied ids that miss
//!   are recorded as [`UNKNOWN_LABEL`]

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Label used when a caller names something that does not exist.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_resolution(route: &str, variant: &str) {
    ::metrics::counter!(
        "smocks_resolutions_total",
        "route" => route.to_string(),
        "variant" => variant.to_string()
    )
    .increment(1);
}

pub fn record_profile_application(profile: &str, applied: bool) {
    ::metrics::counter!(
        "smocks_profile_applications_total",
        "profile" => profile.to_string(),
        "outcome" => outcome(applied)
    )
    .increment(1);
}

pub fn record_action(action: &str, ok: bool) {
    ::metrics::counter!(
        "smocks_action_executions_total",
        "action" => action.to_string(),
        "outcome" => outcome(ok)
    )
    .increment(1);
}

pub fn record_plugin_input_update(plugin: &str) {
    ::metrics::counter!("smocks_plugin_input_updates_total", "plugin" => plugin.to_string()).increment(1);
}

pub fn record_sessions(count: usize) {
    ::metrics::gauge!("smocks_sessions").set(count as f64);
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}
