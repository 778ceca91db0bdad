//! `acctsync apply [FILE|-] [--dry-run] [--backend NAME]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use acctsync_sync::pipeline::{self, EventSource, RunOptions};
use acctsync_sync::{CommandResult, ReconcileReport};

use super::load_config;
use crate::GlobalArgs;

/// Reconcile a batch of JSON-lines change events.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// File of JSON-lines events; `-` or omitted reads stdin.
    pub file: Option<PathBuf>,

    /// Run lookups but print mutating commands instead of running them.
    #[arg(long)]
    pub dry_run: bool,

    /// Only reconcile into the backend with this name.
    #[arg(long, value_name = "NAME")]
    pub backend: Option<String>,
}

impl ApplyArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = load_config(global)?;
        let source = match self.file {
            Some(path) if path.as_os_str() != "-" => EventSource::File(path),
            _ => EventSource::Stdin,
        };
        let options = RunOptions {
            dry_run: self.dry_run,
            backend: self.backend,
        };

        let reports = pipeline::run(&config, &source, &options)
            .context("reconciliation stopped")?;
        print_reports(&reports, options.dry_run);
        Ok(())
    }
}

fn print_reports(reports: &[ReconcileReport], dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let mut applied = 0usize;
    let mut ignored = 0usize;
    let mut planned = 0usize;

    for report in reports {
        println!("{prefix}{} {}", report.backend.bold(), report.event);
        if let Some(reason) = &report.skipped {
            println!("  {} skipped: {reason}", "-".bright_black());
            continue;
        }
        if report.results.is_empty() {
            println!("  {} nothing to do", "·".bright_black());
        }
        for result in &report.results {
            match result {
                CommandResult::Applied { command } => {
                    applied += 1;
                    println!("  {} {command}", "✎".green());
                }
                CommandResult::Ignored { command, code } => {
                    ignored += 1;
                    println!("  {} {command} (exit {code}, already in place)", "·".bright_black());
                }
                CommandResult::WouldRun { command } => {
                    planned += 1;
                    println!("  {} {command}", "~".yellow());
                }
            }
        }
    }

    if dry_run {
        println!("{prefix}{planned} command(s) would run");
    } else {
        println!("✓ {applied} applied, {ignored} already in place");
    }
}
