//! Fabric text-placeholder integration
//!
//! Every catalog entry is registered as its own namespaced id
//! (`luckperms:prefix`, `luckperms:meta`) with the argument passed
//! separately, so routing goes through
//! [`PlaceholderTable::resolve_named`](crate::dispatch::PlaceholderTable::resolve_named).

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::dispatch::{PlaceholderPlatform, Resolution};
use crate::engine::{PermissionEngine, Subject};
use crate::error::RegistrationError;
use crate::provider::PlaceholderProvider;

use super::NAMESPACE;

pub const NO_PLAYER: &str = "No player!";
pub const NO_USER: &str = "No user!";

/// What the host receives for one placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderResult {
    Value(String),
    Invalid(Option<String>),
}

impl PlaceholderResult {
    pub fn invalid(reason: &str) -> Self {
        Self::Invalid(Some(reason.to_string()))
    }
}

pub struct FabricPlaceholders<P> {
    provider: PlaceholderProvider<P>,
}

impl<P: PlaceholderPlatform> FabricPlaceholders<P> {
    pub fn new(platform: P, engine: Arc<dyn PermissionEngine>) -> Result<Self, RegistrationError> {
        Ok(Self {
            provider: PlaceholderProvider::new(platform, engine)?,
        })
    }

    /// Namespaced ids to register, one per name. A name with both a fixed
    /// and a variable form appears once.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for (name, _) in self.provider.placeholders().definitions() {
            let id = format!("{NAMESPACE}:{name}");
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn resolve(&self, player: Option<&Subject>, name: &str, argument: Option<&str>) -> PlaceholderResult {
        self.resolve_at(player, name, argument, Utc::now())
    }

    /// Resolve the placeholder registered as `luckperms:<name>`.
    pub fn resolve_at(
        &self,
        player: Option<&Subject>,
        name: &str,
        argument: Option<&str>,
        now: DateTime<Utc>,
    ) -> PlaceholderResult {
        let Some(player) = player else {
            return PlaceholderResult::invalid(NO_PLAYER);
        };
        let Some(ctx) = self.provider.request_context(player, now) else {
            return PlaceholderResult::invalid(NO_USER);
        };

        match self.provider.resolve_named(&ctx, name, argument) {
            Resolution::Text(text) => PlaceholderResult::Value(text),
            Resolution::Absent | Resolution::Unhandled => PlaceholderResult::Invalid(None),
        }
    }
}
