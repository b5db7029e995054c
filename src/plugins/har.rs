//! HAR viewer plugin.
//!
//! # Responsibilities
//! - Register a `har-load` action that stores a recorded archive in the
//!   session-wide state under `__har`
//! - Look up a recorded call by id for the admin API
//!
//! # Design Decisions
//! - Archives arrive as action input; nothing is read from disk
//! - Both raw HAR (`log.entries`) and the normalized `calls` form are
//!   accepted; raw entries get their index as id unless they carry `_id`
//! - A recorded body that is not JSON is replayed as a JSON string

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::Action;
use crate::engine::context::ExecutionContext;
use crate::plugins::input::{InputField, InputKind};
use crate::plugins::registry::PluginSpec;

pub const HAR_PLUGIN_ID: &str = "har-viewer";
pub const HAR_LOAD_ACTION: &str = "har-load";
/// Session-wide state key holding the loaded archive.
pub const HAR_STATE_KEY: &str = "__har";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HarArchive {
    pub calls: Vec<HarCall>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HarCall {
    pub id: String,
    #[serde(default)]
    pub request: HarRequest,
    pub response: HarResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HarRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HarResponse {
    pub status: u16,
    #[serde(default)]
    pub content: HarContent,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HarContent {
    #[serde(default, rename = "mimeType")]
    pub mime_type: String,
    #[serde(default)]
    pub text: String,
}

impl HarArchive {
    /// Accept either `{"calls": [...]}` or a raw HAR `{"log": {"entries": [...]}}`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("calls").is_some() {
            return serde_json::from_value(value.clone()).ok();
        }

        let entries = value.get("log")?.get("entries")?.as_array()?;
        let calls = entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let id = entry
                    .get("_id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| index.to_string());
                Some(HarCall {
                    id,
                    request: serde_json::from_value(entry.get("request")?.clone()).unwrap_or_default(),
                    response: serde_json::from_value(entry.get("response")?.clone()).ok()?,
                })
            })
            .collect();
        Some(Self { calls })
    }

    pub fn call(&self, id: &str) -> Option<&HarCall> {
        self.calls.iter().find(|c| c.id == id)
    }
}

impl HarCall {
    /// Recorded body, parsed as JSON when possible.
    pub fn body(&self) -> Value {
        serde_json::from_str(&self.response.content.text)
            .unwrap_or_else(|_| Value::String(self.response.content.text.clone()))
    }
}

/// Look up a recorded call in the session behind `ctx`.
///
/// `ctx` must be session-wide (no route bound) to see the archive.
pub fn find_call(ctx: &ExecutionContext<'_>, id: &str) -> Option<(u16, Value)> {
    let archive = HarArchive::from_value(&ctx.state(HAR_STATE_KEY)?)?;
    let call = archive.call(id)?;
    Some((call.response.status, call.body()))
}

/// The plugin spec; its setup hook registers the `har-load` action.
pub fn har_viewer_plugin() -> PluginSpec {
    PluginSpec::new(HAR_PLUGIN_ID)
        .label("HAR viewer")
        .setup(|builder| {
            builder.action(
                Action::new(HAR_LOAD_ACTION, |ctx, input| {
                    let archive = HarArchive::from_value(input)
                        .ok_or("har-load expects {\"calls\": [...]} or a HAR {\"log\": {\"entries\": [...]}}")?;
                    tracing::info!(session = %ctx.session(), calls = archive.calls.len(), "HAR archive loaded");
                    ctx.set_state(HAR_STATE_KEY, serde_json::to_value(&archive)?);
                    Ok(())
                })
                .label("Load HAR archive")
                .input("archive", InputField::new(InputKind::Json, Value::Null)),
            );
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_har_entries() {
        let raw = json!({
            "log": { "entries": [
                { "request": { "method": "GET", "url": "http://x/a" },
                  "response": { "status": 200, "content": { "mimeType": "application/json", "text": "{\"a\":1}" } } },
                { "_id": "second",
                  "request": { "method": "POST", "url": "http://x/b" },
                  "response": { "status": 500, "content": { "text": "boom" } } }
            ]}
        });

        let archive = HarArchive::from_value(&raw).unwrap();
        assert_eq!(archive.calls.len(), 2);
        assert_eq!(archive.call("0").unwrap().body(), json!({ "a": 1 }));
        let second = archive.call("second").unwrap();
        assert_eq!(second.response.status, 500);
        assert_eq!(second.body(), json!("boom"));
    }

    #[test]
    fn test_normalized_calls() {
        let value = json!({ "calls": [
            { "id": "c1", "response": { "status": 201, "content": { "text": "[]" } } }
        ]});
        let archive = HarArchive::from_value(&value).unwrap();
        assert_eq!(archive.call("c1").unwrap().response.status, 201);
        assert!(archive.call("c2").is_none());
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(HarArchive::from_value(&json!({ "nope": true })).is_none());
    }
}
