//! Host plugin adapters
//!
//! Each adapter only translates between a host framework's calling
//! convention and [`PlaceholderProvider`](crate::provider::PlaceholderProvider):
//!
//! ```text
//!   host event ──► adapter ──► PlaceholderProvider ──► PlaceholderTable
//!   (player, id)   (strip/route)   (user lookup, ctx)     (resolver)
//! ```
//!
//! None of them own resolution logic.

pub mod fabric;
pub mod mvdw;
pub mod papi;

pub use fabric::{FabricPlaceholders, PlaceholderResult};
pub use mvdw::Hook;
pub use papi::Expansion;

/// Namespace every adapter registers under.
pub const NAMESPACE: &str = "luckperms";

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use uuid::Uuid;

    use crate::engine::{ContextSet, Group, Node, PermissionEngine, Subject, User};
    use crate::memory::MemoryEngine;

    pub const PLAYER: Uuid = Uuid::from_u128(0x5d3b_cd8e_0f7e_4e5a_9c36_6b0f_1c2d_3e4f);
    pub const STRANGER: Uuid = Uuid::from_u128(0x1);

    pub fn engine() -> Arc<dyn PermissionEngine> {
        let user = User::new(PLAYER, "Steve")
            .with_primary_group("vip")
            .with_node(Node::inheritance("vip"))
            .with_node(Node::new("prefix.10.[Steve] "))
            .with_node(Node::new("meta.rank.gold"));

        Arc::new(
            MemoryEngine::new()
                .with_group(Group::new("vip").with_display_name("V.I.P").with_weight(10))
                .with_user(user, ContextSet::of("server", "lobby")),
        )
    }

    pub fn player() -> Subject {
        Subject::new(PLAYER, "Steve")
    }

    pub fn stranger() -> Subject {
        Subject::new(STRANGER, "Alex")
    }
}
