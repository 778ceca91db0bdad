//! YAML configuration, read once at process start.
//!
//! # Storage layout
//!
//! ```text
//! ~/.acctsync/
//!   config.yaml   (mode 0600, directory mode 0700)
//! ```
//!
//! # API pattern
//!
//! Every filesystem function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! `load_from` / `save_to` take the file path itself, for `--config`.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const DEFAULT_PROJECT: &str = "default";
pub const DEFAULT_MAX_DISPLAY_NAME: usize = 64;
const MIN_DISPLAY_NAME: usize = 8;

const GOLD_DEFAULT_PATH: &str = "/usr/local/gold/bin";
const SLURM_DEFAULT_PATH: &str = "/usr/local/slurm/latest/bin/sacctmgr";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// The accounting system a backend entry drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Gold allocation manager: one executable per command under a bin directory.
    Gold,
    /// Slurm accounting database, administered through `sacctmgr`.
    Slurm,
}

impl BackendKind {
    /// Built-in location of the tool when the config does not name one.
    pub fn default_path(self) -> PathBuf {
        match self {
            BackendKind::Gold => PathBuf::from(GOLD_DEFAULT_PATH),
            BackendKind::Slurm => PathBuf::from(SLURM_DEFAULT_PATH),
        }
    }

    /// Built-in invocation prefix when the config does not name one.
    pub fn default_prefix(self) -> Vec<String> {
        match self {
            BackendKind::Gold => vec![],
            BackendKind::Slurm => vec!["sudo".to_string(), "-uslurm".to_string()],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Gold => write!(f, "gold"),
            BackendKind::Slurm => write!(f, "slurm"),
        }
    }
}

/// One accounting backend to keep in step with the system-of-record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Label used in logs and `--backend`; defaults to the kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: BackendKind,
    /// Gold: directory holding the `g*` tools. Slurm: the `sacctmgr` executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Arguments placed before the tool, e.g. a privilege-elevation wrapper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Vec<String>>,
    /// Project used when an account names no default project.
    #[serde(default = "default_project")]
    pub default_project: String,
}

impl BackendConfig {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            name: None,
            kind,
            path: None,
            prefix: None,
            default_project: default_project(),
        }
    }

    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.kind.to_string())
    }

    pub fn path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| self.kind.default_path())
    }

    pub fn prefix(&self) -> Vec<String> {
        self.prefix
            .clone()
            .unwrap_or_else(|| self.kind.default_prefix())
    }
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Append child process output here instead of the log facade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_log: Option<PathBuf>,
    /// Display names longer than this are truncated before transmission.
    #[serde(default = "default_max_display_name")]
    pub max_display_name: usize,
    pub backends: Vec<BackendConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_log: None,
            max_display_name: DEFAULT_MAX_DISPLAY_NAME,
            backends: vec![BackendConfig::new(BackendKind::Gold)],
        }
    }
}

impl Config {
    /// Look up a backend entry by its name.
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name() == name)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        };

        if self.backends.is_empty() {
            return Err(invalid("no backends configured".to_string()));
        }
        if self.max_display_name < MIN_DISPLAY_NAME {
            return Err(invalid(format!(
                "max_display_name must be at least {MIN_DISPLAY_NAME}, got {}",
                self.max_display_name
            )));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            let name = backend.name();
            if !seen.insert(name.clone()) {
                return Err(invalid(format!("duplicate backend name '{name}'")));
            }
            if backend.default_project.trim().is_empty() {
                return Err(invalid(format!("backend '{name}' has an empty default_project")));
            }
        }
        Ok(())
    }
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

fn default_max_display_name() -> usize {
    DEFAULT_MAX_DISPLAY_NAME
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.acctsync/`
pub fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".acctsync")
}

/// `<home>/.acctsync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("config.yaml")
}

/// `config_path_at` convenience wrapper.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate the config file at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate(path)?;
    Ok(config)
}

/// Load `<home>/.acctsync/config.yaml`.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_to(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Save to `<home>/.acctsync/config.yaml`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    save_to(&config_path_at(home), config)
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Write a default config at `path` with one entry per requested kind.
///
/// Idempotent: if the file already exists, loads and returns it unchanged.
/// An empty `kinds` slice means a single Gold backend.
pub fn init_to(path: &Path, kinds: &[BackendKind]) -> Result<Config, ConfigError> {
    if path.exists() {
        return load_from(path);
    }

    let mut config = Config::default();
    if !kinds.is_empty() {
        let mut unique = Vec::new();
        for kind in kinds {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }
        config.backends = unique.into_iter().map(BackendConfig::new).collect();
    }
    config.validate(path)?;
    save_to(path, &config)?;
    Ok(config)
}

/// `init_to` at `<home>/.acctsync/config.yaml`.
pub fn init_at(home: &Path, kinds: &[BackendKind]) -> Result<Config, ConfigError> {
    init_to(&config_path_at(home), kinds)
}

/// `init_at` convenience wrapper.
pub fn init(kinds: &[BackendKind]) -> Result<Config, ConfigError> {
    init_at(&home()?, kinds)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
