//! Pure planning: desired state plus current backend state in, commands out.
//!
//! | Desired | Backend has record | Commands |
//! |---|---|---|
//! | Present | no  | create, field updates, memberships |
//! | Present | yes | refresh, field updates, memberships |
//! | Absent  | yes | delete |
//! | Absent  | no  | none |
//!
//! Field updates are not diffed against the record: the tools' set-field
//! commands are idempotent, so they are always issued.

use acctsync_backend::{Backend, BackendCommand, BackendError, BackendRecord};
use acctsync_core::Entity;

/// Whether a record should exist in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Desired {
    Present,
    Absent,
}

impl Desired {
    /// Presence implied by the record's own flags.
    pub fn of(entity: &Entity) -> Self {
        if entity.should_exist() {
            Desired::Present
        } else {
            Desired::Absent
        }
    }
}

/// Commands that converge `backend` on `desired` for `entity`.
pub fn plan(
    backend: &dyn Backend,
    entity: &Entity,
    desired: Desired,
    current: Option<&BackendRecord>,
) -> Result<Vec<BackendCommand>, BackendError> {
    let mut commands = Vec::new();
    match (desired, current) {
        (Desired::Present, None) => {
            commands.extend(backend.create(entity)?);
            commands.extend(backend.update_fields(entity)?);
            commands.extend(memberships(backend, entity));
        }
        (Desired::Present, Some(_)) => {
            commands.extend(backend.refresh(entity)?);
            commands.extend(backend.update_fields(entity)?);
            commands.extend(memberships(backend, entity));
        }
        (Desired::Absent, Some(_)) => {
            commands.extend(backend.delete(entity.kind(), entity.key())?);
        }
        (Desired::Absent, None) => {}
    }
    Ok(commands)
}

/// One add-member command per project an account lists.
fn memberships(backend: &dyn Backend, entity: &Entity) -> Vec<BackendCommand> {
    match entity {
        Entity::Account(account) => account
            .projects
            .iter()
            .map(|project| backend.add_member(&account.username, project))
            .collect(),
        _ => vec![],
    }
}
