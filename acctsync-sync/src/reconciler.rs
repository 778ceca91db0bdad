//! Reconciling one change event against one backend.
//!
//! Entity events look the record up, [`plan`] the commands and run them in
//! order. Membership events are driven by the event itself rather than a
//! state diff. Every step is synchronous and the first command that fails
//! (outside its ignorable exit codes) ends the event.

use std::collections::HashMap;

use serde::Serialize;

use acctsync_backend::sanitize::{key_problem, name_problem};
use acctsync_backend::{Backend, BackendCommand, BackendError, ExecOutcome};
use acctsync_core::{
    ChangeEvent, Direction, Entity, EntityKind, MembershipChange, MembershipClear, ProjectId,
    Username,
};

use crate::error::{backend_err, SyncError};
use crate::plan::{plan, Desired};

/// What happened to one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandResult {
    /// The tool ran and exited 0.
    Applied { command: String },
    /// The tool exited with a code meaning "already in the desired state".
    Ignored { command: String, code: i32 },
    /// Dry-run: the command was planned but not spawned.
    WouldRun { command: String },
}

impl CommandResult {
    pub fn command(&self) -> &str {
        match self {
            CommandResult::Applied { command }
            | CommandResult::Ignored { command, .. }
            | CommandResult::WouldRun { command } => command,
        }
    }
}

/// Everything one backend did for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub backend: String,
    pub event: String,
    pub results: Vec<CommandResult>,
    /// Why the event was not applied to this backend at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

pub struct Reconciler {
    backend: Box<dyn Backend>,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(backend: Box<dyn Backend>, dry_run: bool) -> Self {
        Self { backend, dry_run }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn reconcile(&self, event: &ChangeEvent) -> Result<ReconcileReport, SyncError> {
        validate(event)?;
        let label = event.label();
        tracing::debug!("[{}] reconciling {label}", self.backend.name());

        let mut report = ReconcileReport {
            backend: self.backend.name().to_string(),
            event: label,
            results: vec![],
            skipped: None,
        };

        let outcome = match event {
            ChangeEvent::EntityCreated { entity } | ChangeEvent::EntityUpdated { entity } => {
                self.entity(entity, Desired::of(entity), &mut report)
            }
            ChangeEvent::EntityDeleted { entity } => {
                self.entity(entity, Desired::Absent, &mut report)
            }
            ChangeEvent::RelationAdded(change) => self.relation(change, true, &mut report),
            ChangeEvent::RelationRemoved(change) => self.relation(change, false, &mut report),
            ChangeEvent::RelationCleared(clear) => self.clear(clear, &mut report),
        };
        outcome.map_err(backend_err(self.backend.name()))?;
        Ok(report)
    }

    fn entity(
        &self,
        entity: &Entity,
        desired: Desired,
        report: &mut ReconcileReport,
    ) -> Result<(), BackendError> {
        let kind = entity.kind();
        if !self.backend.supports(kind) {
            tracing::warn!(
                "[{}] has no {kind} records; skipping {}",
                self.backend.name(),
                report.event
            );
            report.skipped = Some(format!("{} backend has no {kind} records", self.backend.kind()));
            return Ok(());
        }

        let current = self.backend.lookup(kind, entity.key())?;
        tracing::debug!(
            "[{}] {kind} '{}' is {} in the backend, wanted {desired:?}",
            self.backend.name(),
            entity.key(),
            if current.is_some() { "present" } else { "absent" }
        );
        for command in plan(self.backend.as_ref(), entity, desired, current.as_ref())? {
            report.results.push(self.apply(&command)?);
        }
        Ok(())
    }

    fn relation(
        &self,
        change: &MembershipChange,
        add: bool,
        report: &mut ReconcileReport,
    ) -> Result<(), BackendError> {
        // The account may not be created yet, or already deleted: nothing to do.
        let mut known: HashMap<String, bool> = HashMap::new();
        for (user, project) in change.pairs() {
            let exists = match known.get(&user.as_str().to_lowercase()) {
                Some(exists) => *exists,
                None => {
                    let exists = self.backend.lookup(EntityKind::Account, user.as_str())?.is_some();
                    known.insert(user.as_str().to_lowercase(), exists);
                    exists
                }
            };
            if !exists {
                tracing::debug!(
                    "[{}] account '{user}' not in backend; skipping project '{project}'",
                    self.backend.name()
                );
                continue;
            }
            let command = if add {
                self.backend.add_member(&user, &project)
            } else {
                self.backend.remove_member(&user, &project)
            };
            report.results.push(self.apply(&command)?);
        }
        Ok(())
    }

    fn clear(
        &self,
        clear: &MembershipClear,
        report: &mut ReconcileReport,
    ) -> Result<(), BackendError> {
        let pairs: Vec<(Username, ProjectId)> = match clear.direction {
            Direction::Forward => {
                let project = ProjectId::from(clear.origin.as_str());
                self.backend
                    .list_members(&project)?
                    .into_iter()
                    .map(|user| (user, project.clone()))
                    .collect()
            }
            Direction::Reverse => {
                let user = Username::from(clear.origin.as_str());
                self.backend
                    .list_memberships(&user)?
                    .into_iter()
                    .map(|project| (user.clone(), project))
                    .collect()
            }
        };
        for (user, project) in pairs {
            tracing::debug!(
                "[{}] clearing '{user}' from project '{project}'",
                self.backend.name()
            );
            report
                .results
                .push(self.apply(&self.backend.remove_member(&user, &project))?);
        }
        Ok(())
    }

    fn apply(&self, command: &BackendCommand) -> Result<CommandResult, BackendError> {
        let shown = command.to_string();
        if self.dry_run {
            tracing::info!("[{}] [dry-run] would run: {shown}", self.backend.name());
            return Ok(CommandResult::WouldRun { command: shown });
        }
        match self.backend.execute(command)? {
            ExecOutcome::Succeeded => {
                tracing::info!("[{}] ran: {shown}", self.backend.name());
                Ok(CommandResult::Applied { command: shown })
            }
            ExecOutcome::Ignored(code) => Ok(CommandResult::Ignored {
                command: shown,
                code,
            }),
        }
    }
}

/// Reject keys that cannot be placed on a command line before anything runs.
pub fn validate(event: &ChangeEvent) -> Result<(), SyncError> {
    match event {
        ChangeEvent::EntityCreated { entity }
        | ChangeEvent::EntityUpdated { entity }
        | ChangeEvent::EntityDeleted { entity } => {
            check_key(entity.kind(), entity.key())?;
            if let Entity::Account(account) = entity {
                if let Some(project) = &account.default_project_id {
                    if !project.as_str().is_empty() {
                        check_key(EntityKind::Project, project.as_str())?;
                    }
                }
                for project in &account.projects {
                    check_key(EntityKind::Project, project.as_str())?;
                }
            }
            Ok(())
        }
        ChangeEvent::RelationAdded(change) | ChangeEvent::RelationRemoved(change) => {
            let (origin, other) = sides(change.direction);
            check_key(origin, &change.origin)?;
            change
                .counterparts
                .iter()
                .try_for_each(|key| check_key(other, key))
        }
        ChangeEvent::RelationCleared(clear) => check_key(sides(clear.direction).0, &clear.origin),
    }
}

/// (origin kind, counterpart kind)
fn sides(direction: Direction) -> (EntityKind, EntityKind) {
    match direction {
        Direction::Forward => (EntityKind::Project, EntityKind::Account),
        Direction::Reverse => (EntityKind::Account, EntityKind::Project),
    }
}

fn check_key(kind: EntityKind, key: &str) -> Result<(), SyncError> {
    let problem = match kind {
        EntityKind::Institute => name_problem(key),
        EntityKind::Account | EntityKind::Project => key_problem(key),
    };
    match problem {
        Some(reason) => Err(SyncError::InvalidKey {
            kind,
            key: key.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use acctsync_core::{Account, Institute};

    use super::*;

    #[test]
    fn validation_rejects_unsafe_keys() {
        let event = ChangeEvent::EntityUpdated {
            entity: Entity::Account(Account::new("alice smith")),
        };
        match validate(&event) {
            Err(SyncError::InvalidKey { kind, key, reason }) => {
                assert_eq!(kind, EntityKind::Account);
                assert_eq!(key, "alice smith");
                assert_eq!(reason, "key contains whitespace");
            }
            other => panic!("expected InvalidKey, got {other:?}"),
        }
    }

    #[test]
    fn validation_checks_counterparts_by_direction() {
        let event = ChangeEvent::RelationAdded(MembershipChange {
            direction: Direction::Reverse,
            origin: "alice".into(),
            counterparts: vec!["proj1".into(), "proj|2".into()],
        });
        assert!(matches!(
            validate(&event),
            Err(SyncError::InvalidKey {
                kind: EntityKind::Project,
                ..
            })
        ));
    }

    #[test]
    fn validation_checks_account_projects() {
        let mut account = Account::new("alice");
        account.projects = vec![ProjectId::from("")];
        let event = ChangeEvent::EntityCreated {
            entity: Entity::Account(account),
        };
        assert!(validate(&event).is_err());
    }

    #[test]
    fn institute_names_may_contain_spaces() {
        let named = |name: &str| ChangeEvent::EntityCreated {
            entity: Entity::Institute(Institute {
                name: name.into(),
                is_active: true,
            }),
        };
        assert!(validate(&named("Uni of Here")).is_ok());
        assert!(validate(&named("Uni|Here")).is_err());
    }

    #[test]
    fn command_result_serializes_with_outcome_tag() {
        let result = CommandResult::Ignored {
            command: "grmuser -u alice".into(),
            code: 8,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"outcome":"ignored","command":"grmuser -u alice","code":8}"#);
        assert_eq!(result.command(), "grmuser -u alice");
    }
}
