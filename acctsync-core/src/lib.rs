//! acctsync core library: domain types, configuration, errors.
//!
//! - [`types`]: accounts, projects, institutes and the change events about them
//! - [`config`]: the YAML configuration file and its load / save / init
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{BackendConfig, BackendKind, Config};
pub use error::ConfigError;
pub use types::{
    Account, ChangeEvent, Direction, Entity, EntityKind, Institute, MembershipChange,
    MembershipClear, Project, ProjectId, Username,
};
