//! acctsync: keep Gold and Slurm accounting in step with the system-of-record.
//!
//! # Usage
//!
//! ```text
//! acctsync init [--kind gold|slurm]...
//! acctsync apply [FILE|-] [--dry-run] [--backend NAME]
//! acctsync show <account|project|institute> <KEY> [--backend NAME] [--json]
//! acctsync list <accounts|projects|institutes> [--backend NAME] [--json]
//! acctsync backends
//! ```
//!
//! Every command accepts `--config PATH` (default `~/.acctsync/config.yaml`)
//! and `--verbose`.

mod commands;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use acctsync_core::{BackendKind, EntityKind};
use commands::{
    apply::ApplyArgs, backends::BackendsArgs, init::InitArgs, list::ListArgs, show::ShowArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "acctsync",
    version,
    about = "Reconcile accounts, projects and institutes into Gold and Slurm",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Config file to use instead of ~/.acctsync/config.yaml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log every spawned command and its output (RUST_LOG still wins).
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config file if none exists.
    Init(InitArgs),

    /// Reconcile a batch of JSON-lines change events.
    Apply(ApplyArgs),

    /// Look up a single record in each backend.
    Show(ShowArgs),

    /// List every record of a kind in each backend.
    List(ListArgs),

    /// Print the configured backends and how their tools are invoked.
    Backends(BackendsArgs),
}

// ---------------------------------------------------------------------------
// Shared argument types, parsed from CLI strings into core types
// ---------------------------------------------------------------------------

/// Entity kind as typed on the command line; plural forms are accepted.
#[derive(Debug, Clone, Copy)]
pub struct EntityKindArg(pub EntityKind);

impl FromStr for EntityKindArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "account" | "accounts" | "user" | "users" => Ok(Self(EntityKind::Account)),
            "project" | "projects" => Ok(Self(EntityKind::Project)),
            "institute" | "institutes" | "org" | "orgs" => Ok(Self(EntityKind::Institute)),
            other => Err(format!(
                "unknown kind '{other}'; expected: account, project, institute"
            )),
        }
    }
}

impl fmt::Display for EntityKindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Thin wrapper so clap can parse `BackendKind` from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct BackendKindArg(pub BackendKind);

impl FromStr for BackendKindArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gold" => Ok(Self(BackendKind::Gold)),
            "slurm" => Ok(Self(BackendKind::Slurm)),
            other => Err(format!("unknown backend kind '{other}'; expected: gold, slurm")),
        }
    }
}

impl From<BackendKindArg> for BackendKind {
    fn from(k: BackendKindArg) -> Self {
        k.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    match cli.command {
        Commands::Init(args) => args.run(&cli.global),
        Commands::Apply(args) => args.run(&cli.global),
        Commands::Show(args) => args.run(&cli.global),
        Commands::List(args) => args.run(&cli.global),
        Commands::Backends(args) => args.run(&cli.global),
    }
}

/// Log to stderr so command output on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
