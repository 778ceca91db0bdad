//! Gold allocation manager.
//!
//! Every operation is its own executable under the configured bin
//! directory (`glsuser`, `gmkuser`, …). Queries use `--raw`, which prints
//! pipe-delimited rows without a trailing delimiter.

use std::collections::BTreeMap;
use std::sync::Arc;

use acctsync_core::{BackendConfig, BackendKind, Entity, EntityKind, ProjectId, Username};

use crate::adapter::{default_project_for, split_members, Backend};
use crate::client::{Client, ExecOutcome, HeaderPolicy};
use crate::command::{BackendCommand, Invocation, ToolLayout};
use crate::error::BackendError;
use crate::runner::CommandRunner;
use crate::sanitize::Sanitizer;
use crate::tabular::{BackendRecord, ParseOptions};

/// `grmuser` exit status for a user that is already gone.
pub const USER_ALREADY_ABSENT: i32 = 8;
/// `gchproject --addUsers` exit status for an existing member.
pub const ALREADY_MEMBER: i32 = 74;

const NAME_FIELD: &str = "Name";
const USERS_FIELD: &str = "Users";

pub struct GoldBackend {
    client: Client,
    default_project: String,
    sanitizer: Sanitizer,
}

impl GoldBackend {
    pub fn new(config: &BackendConfig, sanitizer: Sanitizer, runner: Arc<dyn CommandRunner>) -> Self {
        let invocation = Invocation::new(config.prefix(), ToolLayout::BinDir(config.path()));
        Self {
            client: Client::new(config.name(), invocation, runner, ParseOptions::default()),
            default_project: config.default_project.clone(),
            sanitizer,
        }
    }

    fn lookup_args(kind: EntityKind, key: &str) -> Vec<String> {
        let (tool, flag) = match kind {
            EntityKind::Account => ("glsuser", "-u"),
            EntityKind::Project => ("glsproject", "-p"),
            EntityKind::Institute => ("glsorg", "-n"),
        };
        args([tool, flag, key, "--raw"])
    }
}

impl Backend for GoldBackend {
    fn name(&self) -> &str {
        self.client.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gold
    }

    fn describe(&self) -> String {
        self.client.invocation().to_string()
    }

    fn supports(&self, _kind: EntityKind) -> bool {
        true
    }

    fn lookup(&self, kind: EntityKind, key: &str) -> Result<Option<BackendRecord>, BackendError> {
        self.client
            .lookup_one(&Self::lookup_args(kind, key), key, NAME_FIELD)
    }

    fn list(&self, kind: EntityKind) -> Result<BTreeMap<String, BackendRecord>, BackendError> {
        let tool = match kind {
            EntityKind::Account => "glsuser",
            EntityKind::Project => "glsproject",
            EntityKind::Institute => "glsorg",
        };
        self.client
            .query_keyed(&args([tool, "--raw"]), HeaderPolicy::AbsentIsEmpty)
    }

    fn create(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        let key = entity.key();
        Ok(match entity {
            Entity::Account(_) => {
                let project = default_project_for(entity, &self.default_project);
                vec![BackendCommand::new(["gmkuser", "-A", "-p", project.as_str(), "-u", key])]
            }
            Entity::Project(_) => vec![BackendCommand::new(["gmkproject", "-p", key, "-u", "MEMBERS"])],
            Entity::Institute(_) => vec![BackendCommand::new(["gmkorg", "-n", key])],
        })
    }

    fn refresh(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        Ok(match entity {
            Entity::Account(_) => {
                let project = default_project_for(entity, &self.default_project);
                vec![BackendCommand::new(["gchuser", "-p", project.as_str(), "-u", entity.key()])]
            }
            Entity::Project(_) | Entity::Institute(_) => vec![],
        })
    }

    fn update_fields(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        Ok(match entity {
            Entity::Account(account) => {
                let user = account.username.as_str();
                let full_name = self.sanitizer.field(&account.full_name);
                let email = self.sanitizer.field(&account.email);
                vec![
                    BackendCommand::new(["gchuser", "-n", full_name.as_str(), "-u", user]),
                    BackendCommand::new(["gchuser", "-E", email.as_str(), "-u", user]),
                ]
            }
            Entity::Project(project) => {
                let description = self.sanitizer.display_name(&project.display_name);
                vec![BackendCommand::new([
                    "gchproject",
                    "-d",
                    description.as_str(),
                    "-p",
                    project.project_id.as_str(),
                ])]
            }
            Entity::Institute(_) => vec![],
        })
    }

    fn delete(&self, kind: EntityKind, key: &str) -> Result<Vec<BackendCommand>, BackendError> {
        Ok(match kind {
            EntityKind::Account => {
                vec![BackendCommand::new(["grmuser", "-u", key]).ignoring(&[USER_ALREADY_ABSENT])]
            }
            EntityKind::Project => vec![BackendCommand::new(["grmproject", "-p", key])],
            EntityKind::Institute => vec![BackendCommand::new(["grmorg", "-n", key])],
        })
    }

    fn add_member(&self, user: &Username, project: &ProjectId) -> BackendCommand {
        BackendCommand::new(["gchproject", "--addUsers", user.as_str(), "-p", project.as_str()])
            .ignoring(&[ALREADY_MEMBER])
    }

    fn remove_member(&self, user: &Username, project: &ProjectId) -> BackendCommand {
        BackendCommand::new(["gchproject", "--delUsers", user.as_str(), "-p", project.as_str()])
    }

    fn list_members(&self, project: &ProjectId) -> Result<Vec<Username>, BackendError> {
        let query = Self::lookup_args(EntityKind::Project, project.as_str());
        let record = self
            .client
            .lookup_one(&query, project.as_str(), NAME_FIELD)?
            .ok_or_else(|| BackendError::NotFound {
                kind: EntityKind::Project,
                key: project.to_string(),
            })?;
        let users = record.require(USERS_FIELD, "glsproject")?;
        Ok(split_members(users))
    }

    // gbalance also reports projects the user reaches through global or
    // implicit membership; removing those may fail.
    fn list_memberships(&self, user: &Username) -> Result<Vec<ProjectId>, BackendError> {
        if self.lookup(EntityKind::Account, user.as_str())?.is_none() {
            return Err(BackendError::NotFound {
                kind: EntityKind::Account,
                key: user.to_string(),
            });
        }
        let query = args(["gbalance", "-u", user.as_str(), "--raw"]);
        let rows = self.client.query(&query, HeaderPolicy::Required)?;
        rows.iter()
            .map(|row| row.require(NAME_FIELD, "gbalance").map(ProjectId::from))
            .collect()
    }

    fn execute(&self, command: &BackendCommand) -> Result<ExecOutcome, BackendError> {
        self.client.execute(command)
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
