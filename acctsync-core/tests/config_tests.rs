//! Config error-message, atomic-write-safety, and init integration tests.

use assert_fs::prelude::*;
use acctsync_core::{
    config::{self, BackendKind},
    ConfigError,
};
use predicates::prelude::predicate;
use rstest::rstest;
use std::fs;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("config not found"));
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".acctsync/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"), "must contain file path, got: {err}");
}

#[rstest]
#[case::no_backends("backends: []\n", "no backends configured")]
#[case::blank_default("backends:\n  - kind: gold\n    default_project: '  '\n", "empty default_project")]
#[case::duplicate(
    "backends:\n  - kind: gold\n  - kind: slurm\n    name: gold\n",
    "duplicate backend name"
)]
fn load_rejects_unusable_configs(#[case] yaml: &str, #[case] expected: &str) {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".acctsync/config.yaml").write_str(yaml).expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
    assert!(err.to_string().contains(expected), "got: {err}");
}

#[test]
fn load_unknown_kind_is_a_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".acctsync/config.yaml")
        .write_str("backends:\n  - kind: pbs\n")
        .expect("write");
    assert!(matches!(
        config::load_at(home.path()),
        Err(ConfigError::Parse { .. })
    ));
}

// ---------------------------------------------------------------------------
// 2. Init
// ---------------------------------------------------------------------------

#[test]
fn init_writes_default_gold_config() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg = config::init_at(home.path(), &[]).expect("init");
    assert_eq!(cfg.backends.len(), 1);
    assert_eq!(cfg.backends[0].kind, BackendKind::Gold);

    home.child(".acctsync/config.yaml")
        .assert(predicate::path::exists())
        .assert(predicate::str::contains("kind: gold"));
}

#[test]
fn init_with_both_kinds_dedups() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg = config::init_at(
        home.path(),
        &[BackendKind::Slurm, BackendKind::Gold, BackendKind::Slurm],
    )
    .expect("init");
    let names: Vec<String> = cfg.backends.iter().map(|b| b.name()).collect();
    assert_eq!(names, vec!["slurm", "gold"]);
}

#[test]
fn init_is_idempotent_and_keeps_edits() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::init_at(home.path(), &[BackendKind::Gold]).expect("first init");

    let path = config::config_path_at(home.path());
    let edited = fs::read_to_string(&path)
        .expect("read")
        .replace("default_project: default", "default_project: startup");
    fs::write(&path, edited).expect("write");

    let cfg = config::init_at(home.path(), &[BackendKind::Slurm]).expect("second init");
    assert_eq!(cfg.backends.len(), 1, "existing config must not be replaced");
    assert_eq!(cfg.backends[0].default_project, "startup");
}

#[cfg(unix)]
#[test]
fn init_sets_private_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let home = assert_fs::TempDir::new().expect("tempdir");
    config::init_at(home.path(), &[]).expect("init");

    let dir_mode = fs::metadata(config::config_dir_at(home.path()))
        .unwrap()
        .permissions()
        .mode()
        & 0o777;
    let file_mode = fs::metadata(config::config_path_at(home.path()))
        .unwrap()
        .permissions()
        .mode()
        & 0o777;
    assert_eq!(dir_mode, 0o700);
    assert_eq!(file_mode, 0o600);
}

#[test]
fn save_to_explicit_path_outside_home() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.child("etc").child("acctsync.yaml");
    let cfg = config::init_to(path.path(), &[BackendKind::Slurm]).expect("init");
    let loaded = config::load_from(path.path()).expect("load");
    assert_eq!(cfg, loaded);
    path.assert(predicate::str::contains("kind: slurm"));
}
