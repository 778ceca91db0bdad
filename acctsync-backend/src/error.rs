//! Error types for acctsync-backend.

use std::path::PathBuf;

use thiserror::Error;

use acctsync_core::EntityKind;

/// All errors that can arise while talking to an accounting tool.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A command exited with a status that is neither 0 nor ignorable.
    /// `code` is `None` when the process was terminated by a signal.
    #[error("command `{command}` failed with {}", describe_code(.code))]
    ExternalTool { command: String, code: Option<i32> },

    /// The tool could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A command was built with no arguments.
    #[error("refusing to run an empty command")]
    EmptyCommand,

    /// A single-record query returned more than one record.
    #[error("query for '{key}' returned {count} records")]
    AmbiguousRecord { key: String, count: usize },

    /// A query returned a record whose key differs from the requested one.
    #[error("expected record '{expected}' but the backend returned '{actual}'")]
    IdentityMismatch { expected: String, actual: String },

    /// Keyed parsing found two rows with the same key.
    #[error("duplicate record '{key}' in backend output")]
    DuplicateRecord { key: String },

    /// The tool printed no header row where one is required.
    #[error("command `{command}` returned no header row")]
    MissingHeaders { command: String },

    /// A data row has fewer fields than the header row.
    #[error("malformed row {line}: expected {expected} field(s), found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A record lacks a column the adapter relies on.
    #[error("command `{command}` output has no '{field}' column")]
    MissingField { field: String, command: String },

    /// A record the operation depends on does not exist in the backend.
    #[error("{kind} '{key}' does not exist in the backend")]
    NotFound { kind: EntityKind, key: String },

    /// The backend has no notion of this entity kind.
    #[error("backend '{backend}' does not support {kind} records")]
    Unsupported { backend: String, kind: EntityKind },

    /// I/O failure on the command log, with the path it concerns.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BackendError {
    BackendError::Io {
        path: path.into(),
        source,
    }
}
