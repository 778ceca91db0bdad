//! `acctsync show <kind> <KEY> [--backend NAME] [--json]`

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use acctsync_backend::sanitize::{key_problem, name_problem};
use acctsync_backend::BackendRecord;
use acctsync_core::EntityKind;

use super::{load_config, select_backends};
use crate::{EntityKindArg, GlobalArgs};

/// Look up a single record in each backend.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// account | project | institute
    pub kind: EntityKindArg,

    /// Username, project id or institute name.
    pub key: String,

    /// Only query the backend with this name.
    #[arg(long, value_name = "NAME")]
    pub backend: Option<String>,

    /// Output as JSON instead of tables.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ShowJson {
    backend: String,
    supported: bool,
    record: Option<BackendRecord>,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "FIELD")]
    field: String,
    #[tabled(rename = "VALUE")]
    value: String,
}

impl ShowArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let kind = self.kind.0;
        let problem = match kind {
            EntityKind::Institute => name_problem(&self.key),
            EntityKind::Account | EntityKind::Project => key_problem(&self.key),
        };
        if let Some(reason) = problem {
            bail!("invalid {kind} key '{}': {reason}", self.key);
        }

        let config = load_config(global)?;
        let mut found = Vec::new();
        for backend in select_backends(&config, self.backend.as_deref())? {
            if !backend.supports(kind) {
                found.push(ShowJson {
                    backend: backend.name().to_string(),
                    supported: false,
                    record: None,
                });
                continue;
            }
            let record = backend
                .lookup(kind, &self.key)
                .with_context(|| format!("[{}] lookup of {kind} '{}' failed", backend.name(), self.key))?;
            found.push(ShowJson {
                backend: backend.name().to_string(),
                supported: true,
                record,
            });
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&found).context("failed to serialize record JSON")?
            );
            return Ok(());
        }

        for entry in found {
            println!("{}", entry.backend.bold());
            match entry.record {
                _ if !entry.supported => {
                    println!("  {} has no {kind} records", "-".bright_black());
                }
                None => println!("  {} no {kind} '{}'", "·".bright_black(), self.key),
                Some(record) => {
                    let rows: Vec<FieldRow> = record
                        .fields()
                        .iter()
                        .map(|(field, value)| FieldRow {
                            field: field.clone(),
                            value: value.clone(),
                        })
                        .collect();
                    let mut table = Table::new(rows);
                    table.with(Style::rounded());
                    println!("{table}");
                }
            }
        }
        Ok(())
    }
}
