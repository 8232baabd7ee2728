use std::path::PathBuf;

use thiserror::Error;

/// Misconfiguration detected while building a placeholder table.
///
/// These abort startup; they never occur while resolving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("placeholder name must not be empty")]
    EmptyName,

    #[error("placeholder '{0}' is already registered")]
    Duplicate(String),
}

/// Failure to enable a host integration.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("permission engine not provided")]
    EngineUnavailable,

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Failure loading an in-memory engine snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error in snapshot: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate {kind} '{name}' in snapshot")]
    Duplicate { kind: &'static str, name: String },
}

/// Failure loading or saving placeholder configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error accessing {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("serialize error for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        source: toml::ser::Error,
    },
}
