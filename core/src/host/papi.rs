//! PlaceholderAPI-style expansion
//!
//! The host calls `on_placeholder_request` with everything after
//! `%luckperms_` and expects `None` when the expansion does not know the
//! placeholder, so it can fall through to its own handling.
//!
//! The Hytale PlaceholderAPI port uses the same expansion under a
//! namespaced plugin name, see [`Expansion::hytale`].

use std::sync::Arc;

use crate::dispatch::PlaceholderPlatform;
use crate::engine::{PermissionEngine, Subject};
use crate::error::RegistrationError;
use crate::provider::PlaceholderProvider;

use super::NAMESPACE;

pub const IDENTIFIER: &str = NAMESPACE;
pub const PLUGIN_NAME: &str = "LuckPerms";
pub const HYTALE_PLUGIN_NAME: &str = "LuckPerms:LuckPerms";
pub const AUTHOR: &str = "Luck";
pub const VERSION: &str = "5.4-R2";

pub struct Expansion<P> {
    platform: P,
    plugin_name: &'static str,
    engine: Option<Arc<dyn PermissionEngine>>,
    provider: Option<PlaceholderProvider<P>>,
}

impl<P: PlaceholderPlatform + Clone> Expansion<P> {
    /// `engine` is whatever the host's service registry returned.
    pub fn new(platform: P, engine: Option<Arc<dyn PermissionEngine>>) -> Self {
        Self {
            platform,
            plugin_name: PLUGIN_NAME,
            engine,
            provider: None,
        }
    }

    /// Expansion for the Hytale PlaceholderAPI. It registers only once the
    /// host reports the permissions plugin as loaded.
    pub fn hytale(platform: P, engine: Option<Arc<dyn PermissionEngine>>) -> Self {
        Self {
            plugin_name: HYTALE_PLUGIN_NAME,
            ..Self::new(platform, engine)
        }
    }

    pub fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    pub fn plugin_name(&self) -> &'static str {
        self.plugin_name
    }

    pub fn author(&self) -> &'static str {
        AUTHOR
    }

    pub fn version(&self) -> &'static str {
        VERSION
    }

    pub fn can_register(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_registered(&self) -> bool {
        self.provider.is_some()
    }

    /// Build the provider. Returns `Ok(false)` when no engine is available.
    pub fn register(&mut self) -> Result<bool, RegistrationError> {
        let Some(engine) = &self.engine else {
            return Ok(false);
        };

        let provider = PlaceholderProvider::new(self.platform.clone(), Arc::clone(engine))?;
        self.provider = Some(provider);
        tracing::info!(
            identifier = IDENTIFIER,
            plugin = self.plugin_name,
            version = VERSION,
            "Registered expansion"
        );
        Ok(true)
    }

    /// Resolve `identifier` for `player`.
    ///
    /// A missing player or an unregistered expansion renders empty text.
    pub fn on_placeholder_request(&self, player: Option<&Subject>, identifier: &str) -> Option<String> {
        let (Some(player), Some(provider)) = (player, &self.provider) else {
            return Some(String::new());
        };
        provider
            .on_placeholder_request(player, identifier)
            .into_option()
    }
}
