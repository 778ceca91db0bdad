//! The seam between the reconciler and one accounting system.
//!
//! A [`Backend`] answers read-only questions by querying its tool, and turns
//! desired state into [`BackendCommand`]s without running them. Only
//! [`Backend::execute`] mutates anything, so planning can be dry-run.

use std::collections::BTreeMap;
use std::sync::Arc;

use acctsync_core::{BackendConfig, BackendKind, Config, Entity, EntityKind, ProjectId, Username};

use crate::client::ExecOutcome;
use crate::command::BackendCommand;
use crate::error::BackendError;
use crate::gold::GoldBackend;
use crate::runner::{CommandRunner, DiagnosticSink, ProcessRunner};
use crate::sanitize::Sanitizer;
use crate::slurm::SlurmBackend;
use crate::tabular::BackendRecord;

pub trait Backend: Send + Sync {
    /// Label from the configuration, used in logs and reports.
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// How the tool is invoked, for display.
    fn describe(&self) -> String;

    fn supports(&self, kind: EntityKind) -> bool;

    /// The single record named `key`, if the backend has one.
    fn lookup(&self, kind: EntityKind, key: &str) -> Result<Option<BackendRecord>, BackendError>;

    /// Every record of `kind`, keyed by lowercased name.
    fn list(&self, kind: EntityKind) -> Result<BTreeMap<String, BackendRecord>, BackendError>;

    /// Commands that bring a missing record into existence.
    fn create(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError>;

    /// Commands re-asserted on a record that already exists.
    fn refresh(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError>;

    /// Set-field commands, issued whenever the record should exist.
    fn update_fields(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError>;

    fn delete(&self, kind: EntityKind, key: &str) -> Result<Vec<BackendCommand>, BackendError>;

    fn add_member(&self, user: &Username, project: &ProjectId) -> BackendCommand;

    fn remove_member(&self, user: &Username, project: &ProjectId) -> BackendCommand;

    /// Accounts the backend currently lists as members of `project`.
    fn list_members(&self, project: &ProjectId) -> Result<Vec<Username>, BackendError>;

    /// Projects the backend currently associates with `user`.
    fn list_memberships(&self, user: &Username) -> Result<Vec<ProjectId>, BackendError>;

    fn execute(&self, command: &BackendCommand) -> Result<ExecOutcome, BackendError>;
}

/// Shared backends, so a caller can keep a handle to one it hands over.
impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn supports(&self, kind: EntityKind) -> bool {
        (**self).supports(kind)
    }

    fn lookup(&self, kind: EntityKind, key: &str) -> Result<Option<BackendRecord>, BackendError> {
        (**self).lookup(kind, key)
    }

    fn list(&self, kind: EntityKind) -> Result<BTreeMap<String, BackendRecord>, BackendError> {
        (**self).list(kind)
    }

    fn create(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        (**self).create(entity)
    }

    fn refresh(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        (**self).refresh(entity)
    }

    fn update_fields(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        (**self).update_fields(entity)
    }

    fn delete(&self, kind: EntityKind, key: &str) -> Result<Vec<BackendCommand>, BackendError> {
        (**self).delete(kind, key)
    }

    fn add_member(&self, user: &Username, project: &ProjectId) -> BackendCommand {
        (**self).add_member(user, project)
    }

    fn remove_member(&self, user: &Username, project: &ProjectId) -> BackendCommand {
        (**self).remove_member(user, project)
    }

    fn list_members(&self, project: &ProjectId) -> Result<Vec<Username>, BackendError> {
        (**self).list_members(project)
    }

    fn list_memberships(&self, user: &Username) -> Result<Vec<ProjectId>, BackendError> {
        (**self).list_memberships(user)
    }

    fn execute(&self, command: &BackendCommand) -> Result<ExecOutcome, BackendError> {
        (**self).execute(command)
    }
}

/// Build one backend per configuration entry, sharing `runner`.
pub fn connect(config: &Config, runner: Arc<dyn CommandRunner>) -> Vec<Box<dyn Backend>> {
    let sanitizer = Sanitizer::new(config.max_display_name);
    config
        .backends
        .iter()
        .map(|entry| build(entry, sanitizer, runner.clone()))
        .collect()
}

/// Process runner honoring `config.command_log`.
pub fn process_runner(config: &Config) -> Arc<dyn CommandRunner> {
    let sink = match &config.command_log {
        Some(path) => DiagnosticSink::File(path.clone()),
        None => DiagnosticSink::Log,
    };
    Arc::new(ProcessRunner::new(sink))
}

fn build(
    entry: &BackendConfig,
    sanitizer: Sanitizer,
    runner: Arc<dyn CommandRunner>,
) -> Box<dyn Backend> {
    tracing::debug!(
        "configuring {} backend '{}' at {}",
        entry.kind,
        entry.name(),
        entry.path().display()
    );
    match entry.kind {
        BackendKind::Gold => Box::new(GoldBackend::new(entry, sanitizer, runner)),
        BackendKind::Slurm => Box::new(SlurmBackend::new(entry, sanitizer, runner)),
    }
}

/// The project an account is created under.
pub(crate) fn default_project_for(entity: &Entity, fallback: &str) -> String {
    match entity {
        Entity::Account(account) => account
            .default_project_id
            .as_ref()
            .map(|p| p.as_str().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| fallback.to_string()),
        _ => fallback.to_string(),
    }
}

/// Split a comma-separated member column into lowercased usernames.
pub(crate) fn split_members(column: &str) -> Vec<Username> {
    column
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| Username::from(name.to_lowercase()))
        .collect()
}
