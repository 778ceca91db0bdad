//! In-memory backend that behaves like the real tools: commands mutate its
//! state and the exit codes follow the same "already done" conventions.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use acctsync_backend::{
    Backend, BackendCommand, BackendError, BackendRecord, ExecOutcome, Sanitizer,
};
use acctsync_core::{BackendKind, Entity, EntityKind, ProjectId, Username};

pub const ABSENT: i32 = 8;
pub const ALREADY: i32 = 74;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct State {
    /// username → (field → value)
    pub users: BTreeMap<String, BTreeMap<String, String>>,
    /// project → (field → value)
    pub projects: BTreeMap<String, BTreeMap<String, String>>,
    pub institutes: BTreeSet<String>,
    /// (user, project)
    pub members: BTreeSet<(String, String)>,
}

#[derive(Default)]
pub struct FakeBackend {
    pub state: Mutex<State>,
    pub executed: Mutex<Vec<String>>,
    pub lookups: Mutex<usize>,
    /// Commands whose display starts with this fail with exit code 1.
    pub fail_prefix: Option<String>,
    pub no_institutes: bool,
    sanitizer: Sanitizer,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            sanitizer: Sanitizer::new(24),
            ..Default::default()
        }
    }

    pub fn with_user(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(name.to_lowercase(), BTreeMap::new());
        self
    }

    pub fn with_project(self, name: &str, members: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.projects.insert(name.to_lowercase(), BTreeMap::new());
            for member in members {
                state
                    .members
                    .insert((member.to_lowercase(), name.to_lowercase()));
            }
        }
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn snapshot(&self) -> State {
        self.state.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.executed.lock().unwrap().clear();
    }

    fn fail(command: &BackendCommand, code: i32) -> BackendError {
        BackendError::ExternalTool {
            command: command.to_string(),
            code: Some(code),
        }
    }
}

fn cmd(parts: &[&str]) -> BackendCommand {
    BackendCommand::new(parts.iter().copied())
}

impl Backend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gold
    }

    fn describe(&self) -> String {
        "in-memory".into()
    }

    fn supports(&self, kind: EntityKind) -> bool {
        !(self.no_institutes && kind == EntityKind::Institute)
    }

    fn lookup(&self, kind: EntityKind, key: &str) -> Result<Option<BackendRecord>, BackendError> {
        *self.lookups.lock().unwrap() += 1;
        let state = self.state.lock().unwrap();
        let key = key.to_lowercase();
        let fields = match kind {
            EntityKind::Account => state.users.get(&key).cloned(),
            EntityKind::Project => state.projects.get(&key).cloned(),
            EntityKind::Institute => state.institutes.get(&key).map(|_| BTreeMap::new()),
        };
        Ok(fields.map(|fields| {
            let mut pairs = vec![("Name".to_string(), key.clone())];
            pairs.extend(fields);
            BackendRecord::from_pairs(pairs)
        }))
    }

    fn list(&self, kind: EntityKind) -> Result<BTreeMap<String, BackendRecord>, BackendError> {
        let keys: Vec<String> = {
            let state = self.state.lock().unwrap();
            match kind {
                EntityKind::Account => state.users.keys().cloned().collect(),
                EntityKind::Project => state.projects.keys().cloned().collect(),
                EntityKind::Institute => state.institutes.iter().cloned().collect(),
            }
        };
        let mut out = BTreeMap::new();
        for key in keys {
            if let Some(record) = self.lookup(kind, &key)? {
                out.insert(key, record);
            }
        }
        Ok(out)
    }

    fn create(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        Ok(match entity {
            Entity::Account(a) => {
                let project = a
                    .default_project_id
                    .as_ref()
                    .map(|p| p.as_str())
                    .unwrap_or("default");
                vec![cmd(&["mkuser", a.username.as_str(), project])]
            }
            Entity::Project(p) => vec![cmd(&["mkproject", p.project_id.as_str()])],
            Entity::Institute(i) => vec![cmd(&["mkorg", i.name.as_str()])],
        })
    }

    fn refresh(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        Ok(match entity {
            Entity::Account(a) => {
                let project = a
                    .default_project_id
                    .as_ref()
                    .map(|p| p.as_str())
                    .unwrap_or("default");
                vec![cmd(&["chuser", a.username.as_str(), "project", project])]
            }
            _ => vec![],
        })
    }

    fn update_fields(&self, entity: &Entity) -> Result<Vec<BackendCommand>, BackendError> {
        Ok(match entity {
            Entity::Account(a) => {
                let name = self.sanitizer.field(&a.full_name);
                let email = self.sanitizer.field(&a.email);
                vec![
                    cmd(&["chuser", a.username.as_str(), "name", name.as_str()]),
                    cmd(&["chuser", a.username.as_str(), "email", email.as_str()]),
                ]
            }
            Entity::Project(p) => {
                let description = self.sanitizer.display_name(&p.display_name);
                vec![cmd(&["chproject", p.project_id.as_str(), "description", description.as_str()])]
            }
            Entity::Institute(_) => vec![],
        })
    }

    fn delete(&self, kind: EntityKind, key: &str) -> Result<Vec<BackendCommand>, BackendError> {
        Ok(match kind {
            EntityKind::Account => vec![cmd(&["rmuser", key]).ignoring(&[ABSENT])],
            EntityKind::Project => vec![cmd(&["rmproject", key])],
            EntityKind::Institute => vec![cmd(&["rmorg", key])],
        })
    }

    fn add_member(&self, user: &Username, project: &ProjectId) -> BackendCommand {
        cmd(&["addmember", user.as_str(), project.as_str()]).ignoring(&[ALREADY])
    }

    fn remove_member(&self, user: &Username, project: &ProjectId) -> BackendCommand {
        cmd(&["delmember", user.as_str(), project.as_str()])
    }

    fn list_members(&self, project: &ProjectId) -> Result<Vec<Username>, BackendError> {
        let state = self.state.lock().unwrap();
        let key = project.as_str().to_lowercase();
        if !state.projects.contains_key(&key) {
            return Err(BackendError::NotFound {
                kind: EntityKind::Project,
                key,
            });
        }
        Ok(state
            .members
            .iter()
            .filter(|(_, p)| *p == key)
            .map(|(u, _)| Username::from(u.as_str()))
            .collect())
    }

    fn list_memberships(&self, user: &Username) -> Result<Vec<ProjectId>, BackendError> {
        let state = self.state.lock().unwrap();
        let key = user.as_str().to_lowercase();
        Ok(state
            .members
            .iter()
            .filter(|(u, _)| *u == key)
            .map(|(_, p)| ProjectId::from(p.as_str()))
            .collect())
    }

    fn execute(&self, command: &BackendCommand) -> Result<ExecOutcome, BackendError> {
        let shown = command.to_string();
        self.executed.lock().unwrap().push(shown.clone());
        if let Some(prefix) = &self.fail_prefix {
            if shown.starts_with(prefix.as_str()) {
                return Err(Self::fail(command, 1));
            }
        }

        let args: Vec<String> = command.args.iter().map(|a| a.to_lowercase()).collect();
        let mut state = self.state.lock().unwrap();
        let code = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["mkuser", user, _] => {
                if state.users.contains_key(*user) {
                    1
                } else {
                    state.users.insert(user.to_string(), BTreeMap::new());
                    0
                }
            }
            ["chuser", user, field, _] => match state.users.get_mut(*user) {
                Some(fields) => {
                    let raw = command.args[3].clone();
                    fields.insert(field.to_string(), raw);
                    0
                }
                None => 1,
            },
            ["rmuser", user] => {
                if state.users.remove(*user).is_some() {
                    state.members.retain(|(u, _)| u.as_str() != *user);
                    0
                } else {
                    ABSENT
                }
            }
            ["mkproject", project] => {
                state.projects.insert(project.to_string(), BTreeMap::new());
                0
            }
            ["chproject", project, field, _] => match state.projects.get_mut(*project) {
                Some(fields) => {
                    fields.insert(field.to_string(), command.args[3].clone());
                    0
                }
                None => 1,
            },
            ["rmproject", project] => {
                if state.projects.remove(*project).is_some() {
                    state.members.retain(|(_, p)| p.as_str() != *project);
                    0
                } else {
                    1
                }
            }
            ["mkorg", org] => {
                state.institutes.insert(org.to_string());
                0
            }
            ["rmorg", org] => {
                if state.institutes.remove(*org) {
                    0
                } else {
                    1
                }
            }
            ["addmember", user, project] => {
                if state.members.insert((user.to_string(), project.to_string())) {
                    0
                } else {
                    ALREADY
                }
            }
            ["delmember", user, project] => {
                if state.members.remove(&(user.to_string(), project.to_string())) {
                    0
                } else {
                    1
                }
            }
            _ => 2,
        };
        drop(state);

        match code {
            0 => Ok(ExecOutcome::Succeeded),
            code if command.is_ignorable(code) => Ok(ExecOutcome::Ignored(code)),
            code => Err(Self::fail(command, code)),
        }
    }
}
