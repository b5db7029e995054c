//! Upstream proxy plugin.
//!
//! # Responsibilities
//! - Declare the `target` input listing the configured upstreams
//! - Resolve which upstream, if any, a session has chosen
//!
//! # Design Decisions
//! - Upstreams are named in configuration; sessions pick one by name, so
//!   the admin API never accepts arbitrary URLs
//! - A null or unknown selection means "serve mocks"
//! - Forwarding itself belongs to the transport (`http::proxy`)

use std::collections::BTreeMap;

use reqwest::Url;
use serde_json::Value;

use crate::engine::{ConfigError, Engine};
use crate::plugins::input::InputField;
use crate::plugins::registry::PluginSpec;
use crate::state::SessionId;

pub const PROXY_PLUGIN_ID: &str = "proxy";
pub const PROXY_TARGET_INPUT: &str = "target";

/// Named upstream base URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyTargets {
    targets: BTreeMap<String, Url>,
}

impl ProxyTargets {
    /// Parse every configured upstream; the first bad URL fails startup.
    pub fn parse(targets: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut parsed = BTreeMap::new();
        for (name, url) in targets {
            let url = Url::parse(url).map_err(|e| ConfigError::Plugin {
                plugin: PROXY_PLUGIN_ID.to_string(),
                reason: format!("target \"{name}\" has invalid URL \"{url}\": {e}"),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Plugin {
                    plugin: PROXY_PLUGIN_ID.to_string(),
                    reason: format!("target \"{name}\" must use http or https"),
                });
            }
            parsed.insert(name.clone(), url);
        }
        Ok(Self { targets: parsed })
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Url> {
        self.targets.get(name)
    }

    /// Upstream the session selected through the plugin input.
    pub fn selected(&self, engine: &Engine, session: &SessionId) -> Option<(&str, &Url)> {
        let value = engine
            .plugins()
            .get_input_value(PROXY_PLUGIN_ID, PROXY_TARGET_INPUT, session)?;
        let name = value.as_str()?;
        self.targets
            .get_key_value(name)
            .map(|(name, url)| (name.as_str(), url))
    }

    /// Plugin declaration; `target` defaults to null (no proxying).
    pub fn plugin(&self) -> PluginSpec {
        let options = std::iter::once(Value::Null)
            .chain(self.targets.keys().cloned().map(Value::String))
            .collect();
        let names: Vec<String> = self.targets.keys().cloned().collect();
        PluginSpec::new(PROXY_PLUGIN_ID)
            .label("Proxy")
            .input(
                PROXY_TARGET_INPUT,
                InputField::select(Value::Null, options).with_label("Proxy to"),
            )
            .setup(move |_| {
                tracing::info!(targets = ?names, "Proxy targets registered");
                Ok(())
            })
    }
}

/// Join `base` with the request's path and query.
///
/// A base path is kept as a prefix: `http://up/api` + `/items?x=1`
/// becomes `http://up/api/items?x=1`.
pub fn upstream_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}{path}"));
    url.set_query(query);
    url
}
