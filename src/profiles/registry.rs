//! Profile definitions and registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::routing::route::Route;
use crate::state::{RouteState, StateMap};

/// What a profile says about one route.
///
/// An empty instruction leaves the route to its predicates and default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteInstruction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "StateMap::is_empty")]
    pub input: StateMap,
}

impl RouteInstruction {
    pub fn variant(id: impl Into<String>) -> Self {
        Self {
            variant: Some(id.into()),
            input: StateMap::new(),
        }
    }

    pub fn with_input(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(id.into(), value.into());
        self
    }

    /// Write this instruction into a freshly reset route region.
    pub(crate) fn apply(&self, route: &Route, state: &mut RouteState) {
        if let Some(variant) = &self.variant {
            if route.variant(variant).is_some() {
                state.selected_variant = Some(variant.clone());
            } else {
                tracing::warn!(route = %route.id(), variant = %variant, "Profile names unknown variant");
            }
        }
        state
            .input
            .extend(self.input.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Named preset of route instructions, keyed by route id.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Profile {
    routes: BTreeMap<String, RouteInstruction>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route_id: impl Into<String>, instruction: RouteInstruction) -> Self {
        self.routes.insert(route_id.into(), instruction);
        self
    }

    pub fn instruction(&self, route_id: &str) -> Option<&RouteInstruction> {
        self.routes.get(route_id)
    }

    pub fn routes(&self) -> &BTreeMap<String, RouteInstruction> {
        &self.routes
    }
}

/// Either a registered profile id or an inline profile.
#[derive(Debug, Clone, Copy)]
pub enum ProfileSelector<'p> {
    Id(&'p str),
    Spec(&'p Profile),
}

impl<'p> From<&'p str> for ProfileSelector<'p> {
    fn from(id: &'p str) -> Self {
        ProfileSelector::Id(id)
    }
}

impl<'p> From<&'p String> for ProfileSelector<'p> {
    fn from(id: &'p String) -> Self {
        ProfileSelector::Id(id)
    }
}

impl<'p> From<&'p Profile> for ProfileSelector<'p> {
    fn from(profile: &'p Profile) -> Self {
        ProfileSelector::Spec(profile)
    }
}

/// Registered profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a profile.
    pub fn register(&mut self, id: impl Into<String>, profile: Profile) {
        self.profiles.insert(id.into(), profile);
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn all(&self) -> &BTreeMap<String, Profile> {
        &self.profiles
    }

    /// Resolve a selector to a profile; unknown ids give `None`.
    pub fn resolve<'p>(&'p self, selector: ProfileSelector<'p>) -> Option<&'p Profile> {
        match selector {
            ProfileSelector::Id(id) => self.profiles.get(id),
            ProfileSelector::Spec(profile) => Some(profile),
        }
    }
}
