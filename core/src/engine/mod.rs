//! Permissions engine boundary
//!
//! Placeholders never compute permissions themselves. Everything they read
//! goes through [`PermissionEngine`], which a host implements over its real
//! permissions system (or [`MemoryEngine`](crate::memory::MemoryEngine) for
//! tests and offline use).
//!
//! ```text
//!   host placeholder event
//!            │
//!            ▼
//!   PlaceholderProvider ──► PlaceholderTable ──► resolver
//!                                                   │
//!                                                   ▼
//!                                          PermissionEngine
//! ```

mod context;
mod model;

use std::sync::Arc;

use uuid::Uuid;

pub use context::{ContextSet, QueryMode, QueryOptions};
pub use model::{
    GROUP_NODE_PREFIX, Group, MetaData, MetaStackDefinition, MetaStackElement, Node, Track,
    Tristate, User,
};

/// The player (or other subject) a placeholder is being rendered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject {
    pub uuid: Uuid,
    pub name: String,
}

impl Subject {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
        }
    }
}

/// Read-only access to a permissions engine.
///
/// Implementations must be cheap to call: every placeholder render performs
/// several lookups synchronously. Accessors must be safe for concurrent reads
/// since a provider may be shared across server threads.
pub trait PermissionEngine: Send + Sync {
    /// Loaded user record for `uuid`, if any.
    fn user(&self, uuid: Uuid) -> Option<Arc<User>>;

    /// Query options currently applying to `subject` (world, server, ...).
    fn query_options(&self, subject: &Subject) -> QueryOptions;

    /// The subject's current contexts.
    fn contexts(&self, subject: &Subject) -> ContextSet;

    /// Group by name, case-insensitive.
    fn group(&self, name: &str) -> Option<Arc<Group>>;

    /// Track by name, case-insensitive.
    fn track(&self, name: &str) -> Option<Arc<Track>>;

    /// Cached meta data for `user` under `options`, honouring any meta stacks
    /// the options carry.
    fn meta_data(&self, user: &User, options: &QueryOptions) -> MetaData;

    /// Effective permission check after inheritance and overrides.
    fn check_permission(&self, user: &User, options: &QueryOptions, permission: &str)
    -> Tristate;

    /// Every group `user` inherits under `options`, in resolution order.
    fn inherited_groups(&self, user: &User, options: &QueryOptions) -> Vec<Arc<Group>>;

    /// The user's nodes plus those inherited from groups, in resolution order.
    fn resolve_inherited_nodes(&self, user: &User, options: &QueryOptions) -> Vec<Node>;

    /// Parse a meta stack element definition such as `highest_own`.
    fn parse_stack_element(&self, definition: &str) -> Option<MetaStackElement>;
}
