//! MVdWPlaceholderAPI hook
//!
//! Registered once under the wildcard `luckperms_*`; the host hands over the
//! full placeholder and we strip our prefix before dispatch.

use std::sync::Arc;

use crate::dispatch::PlaceholderPlatform;
use crate::engine::{PermissionEngine, Subject};
use crate::error::HostError;
use crate::provider::PlaceholderProvider;

/// Pattern registered with the host.
pub const WILDCARD: &str = "luckperms_*";

const PREFIX: &str = "luckperms_";

pub struct Hook<P> {
    provider: PlaceholderProvider<P>,
}

impl<P: PlaceholderPlatform> Hook<P> {
    /// Enable the hook. Fails when the host has no engine registered.
    pub fn enable(platform: P, engine: Option<Arc<dyn PermissionEngine>>) -> Result<Self, HostError> {
        let engine = engine.ok_or(HostError::EngineUnavailable)?;
        let provider = PlaceholderProvider::new(platform, engine)?;
        tracing::info!(pattern = WILDCARD, "Registered placeholder hook");
        Ok(Self { provider })
    }

    pub fn pattern(&self) -> &'static str {
        WILDCARD
    }

    /// Handle a replace event. Placeholders outside our namespace return
    /// `None`; a missing player renders empty text.
    pub fn on_placeholder_replace(&self, player: Option<&Subject>, placeholder: &str) -> Option<String> {
        let identifier = placeholder.strip_prefix(PREFIX)?.to_lowercase();
        let Some(player) = player else {
            return Some(String::new());
        };
        self.provider
            .on_placeholder_request(player, &identifier)
            .into_option()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fixtures;
    use placard_types::BooleanFormat;

    fn hook() -> Hook<BooleanFormat> {
        Hook::enable(BooleanFormat::new("true", "false"), Some(fixtures::engine())).unwrap()
    }

    #[test]
    fn test_enable_requires_engine() {
        let result = Hook::enable(BooleanFormat::default(), None);
        assert!(matches!(result, Err(HostError::EngineUnavailable)));
    }

    #[test]
    fn test_strips_prefix() {
        let hook = hook();
        let player = fixtures::player();
        assert_eq!(hook.pattern(), "luckperms_*");
        assert_eq!(
            hook.on_placeholder_replace(Some(&player), "luckperms_META_rank"),
            Some("gold".to_string())
        );
        assert_eq!(
            hook.on_placeholder_replace(Some(&player), "luckperms_in_group_admin"),
            Some("false".to_string())
        );
    }

    #[test]
    fn test_foreign_placeholder_ignored() {
        let hook = hook();
        assert_eq!(hook.on_placeholder_replace(Some(&fixtures::player()), "vault_prefix"), None);
        assert_eq!(hook.on_placeholder_replace(None, "vault_prefix"), None);
    }

    #[test]
    fn test_missing_player() {
        assert_eq!(hook().on_placeholder_replace(None, "luckperms_prefix"), Some(String::new()));
    }
}
