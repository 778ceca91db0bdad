//! Slurm accounting database, administered with `sacctmgr`.
//!
//! Every command goes through one executable, run as
//! `<prefix…> sacctmgr -ip <args…>`: `-i` commits without prompting and
//! `-p` prints parsable rows that end in a trailing delimiter. Slurm "users"
//! are accounts here and Slurm "accounts" are projects. Slurm has no
//! institutes.

use std::collections::BTreeMap;
use std::sync::Arc;

use acctsync_core::{BackendConfig, BackendKind, Entity, EntityKind, ProjectId, Username};

use crate::adapter::{default_project_for, Backend};
use crate::client::{Client, ExecOutcome, HeaderPolicy};
use crate::command::{BackendCommand, Invocation, ToolLayout};
use crate::error::BackendError;
use crate::runner::CommandRunner;
use crate::sanitize::Sanitizer;
use crate::tabular::{BackendRecord, ParseOptions};

const USER_FIELD: &str = "User";
const ACCOUNT_FIELD: &str = "Account";

pub struct SlurmBackend {
    client: Client,
    default_project: String,
    sanitizer: Sanitizer,
}

impl SlurmBackend {
    pub fn new(config: &BackendConfig, sanitizer: Sanitizer, runner: Arc<dyn CommandRunner>) -> Self {
        let invocation = Invocation::new(
            config.prefix(),
            ToolLayout::Single {
                program: config.path(),
                leading: vec!["-ip".to_string()],
            },
        );
        let parse = ParseOptions {
            trailing_delimiter: true,
        };
        Self {
            client: Client::new(config.name(), invocation, runner, parse),
            default_project: config.default_project.clone(),
            sanitizer,
        }
    }

    fn unsupported(&self, kind: EntityKind) -> BackendError {
        BackendError::Unsupported {
            backend: self.name().to_string(),
            kind,
        }
    }
}

impl Backend for SlurmBackend {
    fn name(&self) -> &str {
        self.client.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Slurm
    }

    fn describe(&self) -> String {
        self.client.invocation().to_string()
    }

    fn supports(&self, kind: EntityKind) -> bool {
        kind != EntityKind::Institute
    }

    fn lookup(&self, kind: EntityKind, key: &str) -> Result<Option<BackendRecord>, BackendError> {
        let name = format!("name={key}");
        match kind {
            EntityKind::Account => {
                self.client
                    .lookup_one(&args(["list", "user", "where", name.as_str()]), key, USER_FIELD)
            }
            EntityKind::Project => {
                self.client
                    .lookup_one(&args(["list", "accounts", "where", name.as_str()]), key, ACCOUNT_FIELD)
            }
            EntityKind::Institute => Err(self.unsupported(kind)),
        }
    }

    fn list(&self, kind: EntityKind) -> Result<BTreeMap<String, BackendRecord>, BackendError> {
        let what = match kind {
            EntityKind::Account => "users",
            EntityKind::Project => "accounts",
            EntityKind::Institute => return Err(self.unsupported(kind)),
        };
        self.client
            .query_keyed(&args(["list", what]), HeaderPolicy::AbsentIsEmpty)
    }

    fn create(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        let key = entity.key();
        match entity {
            Entity::Account(_) => {
                let project = default_project_for(entity, &self.default_project);
                Ok(vec![BackendCommand::new([
                    "add".to_string(),
                    "user".to_string(),
                    format!("accounts={project}"),
                    format!("defaultaccount={project}"),
                    format!("name={key}"),
                ])])
            }
            Entity::Project(_) => Ok(vec![BackendCommand::new([
                "add".to_string(),
                "account".to_string(),
                format!("name={key}"),
                "grpcpumins=0".to_string(),
            ])]),
            Entity::Institute(_) => Err(self.unsupported(entity.kind())),
        }
    }

    fn refresh(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        match entity {
            Entity::Account(_) => {
                let project = default_project_for(entity, &self.default_project);
                Ok(vec![BackendCommand::new([
                    "modify".to_string(),
                    "user".to_string(),
                    "set".to_string(),
                    format!("defaultaccount={project}"),
                    "where".to_string(),
                    format!("name={}", entity.key()),
                ])])
            }
            Entity::Project(_) => Ok(vec![]),
            Entity::Institute(_) => Err(self.unsupported(entity.kind())),
        }
    }

    fn update_fields(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        match entity {
            Entity::Account(_) => Ok(vec![]),
            Entity::Project(project) => {
                let description = self.sanitizer.display_name(&project.display_name);
                let organization = self.sanitizer.field(&project.institute_name);
                let mut parts = vec![
                    "modify".to_string(),
                    "account".to_string(),
                    "set".to_string(),
                    format!("description={description}"),
                ];
                if !organization.is_empty() {
                    parts.push(format!("organization={organization}"));
                }
                parts.push("where".to_string());
                parts.push(format!("name={}", project.project_id));
                Ok(vec![BackendCommand::new(parts)])
            }
            Entity::Institute(_) => Err(self.unsupported(entity.kind())),
        }
    }

    fn delete(&self, kind: EntityKind, key: &str) -> Result<Vec<BackendCommand>, BackendError> {
        let what = match kind {
            EntityKind::Account => "user",
            EntityKind::Project => "account",
            EntityKind::Institute => return Err(self.unsupported(kind)),
        };
        Ok(vec![BackendCommand::new([
            "delete".to_string(),
            what.to_string(),
            format!("name={key}"),
        ])])
    }

    fn add_member(&self, user: &Username, project: &ProjectId) -> BackendCommand {
        BackendCommand::new([
            "add".to_string(),
            "user".to_string(),
            format!("name={user}"),
            format!("accounts={project}"),
        ])
    }

    fn remove_member(&self, user: &Username, project: &ProjectId) -> BackendCommand {
        BackendCommand::new([
            "delete".to_string(),
            "user".to_string(),
            format!("name={user}"),
            format!("account={project}"),
        ])
    }

    fn list_members(&self, project: &ProjectId) -> Result<Vec<Username>, BackendError> {
        let query = args(["list", "assoc", "where", format!("account={project}").as_str()]);
        let rows = self.client.query(&query, HeaderPolicy::Required)?;
        let mut members = Vec::new();
        for row in &rows {
            let user = row.require(USER_FIELD, "list assoc")?;
            // The account's own association row has an empty user.
            if !user.is_empty() {
                members.push(Username::from(user.to_lowercase()));
            }
        }
        Ok(members)
    }

    fn list_memberships(&self, user: &Username) -> Result<Vec<ProjectId>, BackendError> {
        let query = args(["list", "assoc", "where", format!("user={user}").as_str()]);
        let rows = self.client.query(&query, HeaderPolicy::Required)?;
        rows.iter()
            .map(|row| row.require(ACCOUNT_FIELD, "list assoc").map(ProjectId::from))
            .collect()
    }

    fn execute(&self, command: &BackendCommand) -> Result<ExecOutcome, BackendError> {
        self.client.execute(command)
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
