//! `acctsync list <kind> [--backend NAME] [--json]`

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use acctsync_backend::BackendRecord;

use super::{load_config, select_backends};
use crate::{EntityKindArg, GlobalArgs};

/// List every record of a kind in each backend.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// accounts | projects | institutes
    pub kind: EntityKindArg,

    /// Only query the backend with this name.
    #[arg(long, value_name = "NAME")]
    pub backend: Option<String>,

    /// Output as JSON instead of tables.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ListJson {
    backend: String,
    supported: bool,
    records: BTreeMap<String, BackendRecord>,
}

impl ListArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let kind = self.kind.0;
        let config = load_config(global)?;

        let mut listings = Vec::new();
        for backend in select_backends(&config, self.backend.as_deref())? {
            let supported = backend.supports(kind);
            let records = if supported {
                backend
                    .list(kind)
                    .with_context(|| format!("[{}] listing {kind} records failed", backend.name()))?
            } else {
                BTreeMap::new()
            };
            listings.push(ListJson {
                backend: backend.name().to_string(),
                supported,
                records,
            });
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&listings).context("failed to serialize listing JSON")?
            );
            return Ok(());
        }

        for listing in listings {
            println!(
                "{} | {} {kind} record(s)",
                listing.backend.bold(),
                listing.records.len()
            );
            if !listing.supported {
                println!("  {} has no {kind} records", "-".bright_black());
                continue;
            }
            if let Some(table) = render(&listing.records) {
                println!("{table}");
            }
        }
        Ok(())
    }
}

/// One column per header of the first record; every row shares the tool's header.
fn render(records: &BTreeMap<String, BackendRecord>) -> Option<String> {
    let first = records.values().next()?;
    let headers: Vec<String> = first.fields().iter().map(|(name, _)| name.clone()).collect();

    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_uppercase()));
    for record in records.values() {
        builder.push_record(
            headers
                .iter()
                .map(|h| record.get(h).unwrap_or_default().to_string()),
        );
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    Some(table.to_string())
}
