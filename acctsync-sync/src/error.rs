//! Error types for acctsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use acctsync_backend::BackendError;
use acctsync_core::{ConfigError, EntityKind};

/// All errors that can arise while reconciling change events.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A backend operation failed; the event's reconciliation stopped there.
    #[error("backend '{backend}': {source}")]
    Backend {
        backend: String,
        #[source]
        source: BackendError,
    },

    /// An error from loading the configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A key that cannot be passed safely on a tool's command line.
    #[error("invalid {kind} key {key:?}: {reason}")]
    InvalidKey {
        kind: EntityKind,
        key: String,
        reason: &'static str,
    },

    /// `--backend` named nothing in the configuration.
    #[error("no backend named '{name}' in the configuration")]
    UnknownBackend { name: String },

    /// A line of JSON-lines input is not a change event.
    #[error("invalid event on line {line}: {source}")]
    Events {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn backend_err(backend: &str) -> impl FnOnce(BackendError) -> SyncError + '_ {
    move |source| SyncError::Backend {
        backend: backend.to_string(),
        source,
    }
}
