pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod host;
pub mod memory;
pub mod provider;


// Re-exports for convenience
pub use dispatch::{Arity, Placeholder, PlaceholderPlatform, PlaceholderTable, PlaceholderValue, Resolution};
pub use engine::{PermissionEngine, Subject};
pub use error::{ConfigError, HostError, RegistrationError, SnapshotError};
pub use memory::MemoryEngine;
pub use provider::{PlaceholderProvider, RequestContext};
