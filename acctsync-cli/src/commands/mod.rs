pub mod apply;
pub mod backends;
pub mod init;
pub mod list;
pub mod show;

use anyhow::{bail, Context, Result};

use acctsync_backend::{connect, process_runner, Backend};
use acctsync_core::{config, Config};

use crate::GlobalArgs;

/// Load the config named by `--config`, or the default one.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let config = match &global.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => config::load().context("failed to load config")?,
    };
    tracing::debug!("loaded {} backend(s) from config", config.backends.len());
    Ok(config)
}

/// Configured backends, optionally narrowed to the one named `only`.
pub(crate) fn select_backends(config: &Config, only: Option<&str>) -> Result<Vec<Box<dyn Backend>>> {
    let mut backends = connect(config, process_runner(config));
    if let Some(name) = only {
        backends.retain(|backend| backend.name() == name);
        if backends.is_empty() {
            let known: Vec<String> = config.backends.iter().map(|b| b.name()).collect();
            bail!(
                "no backend named '{name}' in config; configured: {}",
                known.join(", ")
            );
        }
    }
    Ok(backends)
}
