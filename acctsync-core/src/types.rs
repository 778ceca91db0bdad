//! Domain types mirrored from the system-of-record.
//!
//! Keys (`Username`, `ProjectId`) are case-insensitive: two keys are the same
//! record when their lowercased forms match. The original spelling is kept for
//! transmission to the backends.
//!
//! All types are (de)serializable via serde so change events can be handed
//! over as JSON lines.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Login name of an account on the compute resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    /// Case-insensitive comparison against a key reported by a backend.
    pub fn matches(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.to_lowercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Stable identifier of a resource-allocation project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Case-insensitive comparison against a key reported by a backend.
    pub fn matches(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.to_lowercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The three entity kinds mirrored into a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Account,
    Project,
    Institute,
}

impl EntityKind {
    pub fn all() -> &'static [EntityKind] {
        &[EntityKind::Account, EntityKind::Project, EntityKind::Institute]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Account => write!(f, "account"),
            EntityKind::Project => write!(f, "project"),
            EntityKind::Institute => write!(f, "institute"),
        }
    }
}

/// Which side of the account/project relation fired a membership event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Fired from the project: origin is a project id, counterparts are usernames.
    #[default]
    Forward,
    /// Fired from the account: origin is a username, counterparts are project ids.
    Reverse,
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A login identity on a compute resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: Username,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project_id: Option<ProjectId>,
    /// Presence means the account is logically deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Projects the account currently belongs to in the system-of-record.
    #[serde(default)]
    pub projects: Vec<ProjectId>,
}

impl Account {
    pub fn new(username: impl Into<Username>) -> Self {
        Self {
            username: username.into(),
            full_name: String::new(),
            email: String::new(),
            default_project_id: None,
            deleted_at: None,
            projects: vec![],
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A resource-allocation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub institute_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// An organization owning projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institute {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Any record the change notifier can report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Account(Account),
    Project(Project),
    Institute(Institute),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Account(_) => EntityKind::Account,
            Entity::Project(_) => EntityKind::Project,
            Entity::Institute(_) => EntityKind::Institute,
        }
    }

    /// The stable key the backend knows this record by.
    pub fn key(&self) -> &str {
        match self {
            Entity::Account(a) => a.username.as_str(),
            Entity::Project(p) => p.project_id.as_str(),
            Entity::Institute(i) => &i.name,
        }
    }

    /// Whether the record should exist in a backend.
    pub fn should_exist(&self) -> bool {
        match self {
            Entity::Account(a) => !a.is_deleted(),
            Entity::Project(p) => p.is_active,
            Entity::Institute(i) => i.is_active,
        }
    }
}

// ---------------------------------------------------------------------------
// Change events
// ---------------------------------------------------------------------------

/// Membership rows added to or removed from the relation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    #[serde(default)]
    pub direction: Direction,
    /// Key of the record the event fired from.
    pub origin: String,
    /// Keys of the affected records on the other side of the relation.
    #[serde(default)]
    pub counterparts: Vec<String>,
}

impl MembershipChange {
    /// Expand into `(username, project)` pairs in counterpart order.
    pub fn pairs(&self) -> Vec<(Username, ProjectId)> {
        self.counterparts
            .iter()
            .map(|other| match self.direction {
                Direction::Forward => (
                    Username::from(other.as_str()),
                    ProjectId::from(self.origin.as_str()),
                ),
                Direction::Reverse => (
                    Username::from(self.origin.as_str()),
                    ProjectId::from(other.as_str()),
                ),
            })
            .collect()
    }
}

/// Every membership of one record was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipClear {
    #[serde(default)]
    pub direction: Direction,
    pub origin: String,
}

/// The six change shapes emitted by the system-of-record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    EntityCreated { entity: Entity },
    EntityUpdated { entity: Entity },
    EntityDeleted { entity: Entity },
    RelationAdded(MembershipChange),
    RelationRemoved(MembershipChange),
    RelationCleared(MembershipClear),
}

impl ChangeEvent {
    /// Short human-readable label, used in logs and reports.
    pub fn label(&self) -> String {
        match self {
            ChangeEvent::EntityCreated { entity } => {
                format!("{} '{}' created", entity.kind(), entity.key())
            }
            ChangeEvent::EntityUpdated { entity } => {
                format!("{} '{}' updated", entity.kind(), entity.key())
            }
            ChangeEvent::EntityDeleted { entity } => {
                format!("{} '{}' deleted", entity.kind(), entity.key())
            }
            ChangeEvent::RelationAdded(change) => format!(
                "membership added from {} '{}' ({} counterpart(s))",
                origin_kind(change.direction),
                change.origin,
                change.counterparts.len()
            ),
            ChangeEvent::RelationRemoved(change) => format!(
                "membership removed from {} '{}' ({} counterpart(s))",
                origin_kind(change.direction),
                change.origin,
                change.counterparts.len()
            ),
            ChangeEvent::RelationCleared(clear) => format!(
                "memberships cleared from {} '{}'",
                origin_kind(clear.direction),
                clear.origin
            ),
        }
    }
}

fn origin_kind(direction: Direction) -> EntityKind {
    match direction {
        Direction::Forward => EntityKind::Project,
        Direction::Reverse => EntityKind::Account,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
