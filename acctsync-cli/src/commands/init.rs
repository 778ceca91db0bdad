//! `acctsync init [--kind gold|slurm]...`

use anyhow::{Context, Result};
use clap::Args;

use acctsync_core::{config, BackendKind};

use crate::{BackendKindArg, GlobalArgs};

/// Write a default config file if none exists.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Backend kind to configure; repeat for several. Defaults to gold.
    #[arg(long = "kind", short = 'k', value_name = "KIND")]
    pub kinds: Vec<BackendKindArg>,
}

impl InitArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let kinds: Vec<BackendKind> = self.kinds.into_iter().map(Into::into).collect();
        let path = match &global.config {
            Some(path) => path.clone(),
            None => config::config_path().context("cannot locate default config path")?,
        };
        let existed = path.exists();
        let config = config::init_to(&path, &kinds)
            .with_context(|| format!("failed to init config at '{}'", path.display()))?;

        if existed {
            println!("✓ Config already present at {}", path.display());
        } else {
            println!("✓ Wrote default config to {}", path.display());
        }
        for backend in &config.backends {
            println!(
                "  {} ({}) at {}",
                backend.name(),
                backend.kind,
                backend.path().display()
            );
        }
        Ok(())
    }
}
