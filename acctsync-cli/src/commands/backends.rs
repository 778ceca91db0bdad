//! `acctsync backends`

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use acctsync_core::EntityKind;

use super::{load_config, select_backends};
use crate::GlobalArgs;

/// Print the configured backends and how their tools are invoked.
#[derive(Args, Debug)]
pub struct BackendsArgs {}

#[derive(Tabled)]
struct BackendRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "INSTITUTES")]
    institutes: String,
    #[tabled(rename = "INVOCATION")]
    invocation: String,
}

impl BackendsArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = load_config(global)?;
        let rows: Vec<BackendRow> = select_backends(&config, None)?
            .iter()
            .map(|backend| BackendRow {
                name: backend.name().to_string(),
                kind: backend.kind().to_string(),
                institutes: if backend.supports(EntityKind::Institute) {
                    "yes".to_string()
                } else {
                    "no".to_string()
                },
                invocation: backend.describe(),
            })
            .collect();

        println!("{} backend(s) configured", rows.len().to_string().bold());
        if let Some(log) = &config.command_log {
            println!("Command output is appended to {}", log.display());
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
