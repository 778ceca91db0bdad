//! Callback API the system-of-record calls on every change.

use std::sync::Arc;

use acctsync_backend::{connect, process_runner, Backend, CommandRunner};
use acctsync_core::{ChangeEvent, Config};

use crate::error::SyncError;
use crate::reconciler::{ReconcileReport, Reconciler};

/// Receives change events as they happen.
pub trait ChangeListener {
    fn on_change(&self, event: &ChangeEvent) -> Result<Vec<ReconcileReport>, SyncError>;
}

/// Fans each event out to every configured backend, in configuration order.
pub struct Dispatcher {
    reconcilers: Vec<Reconciler>,
}

impl Dispatcher {
    pub fn new(backends: Vec<Box<dyn Backend>>, dry_run: bool) -> Self {
        Self {
            reconcilers: backends
                .into_iter()
                .map(|backend| Reconciler::new(backend, dry_run))
                .collect(),
        }
    }

    /// Backends from `config`, spawning real processes.
    ///
    /// `only` restricts dispatch to the backend with that name.
    pub fn from_config(config: &Config, dry_run: bool, only: Option<&str>) -> Result<Self, SyncError> {
        Self::with_runner(config, process_runner(config), dry_run, only)
    }

    pub fn with_runner(
        config: &Config,
        runner: Arc<dyn CommandRunner>,
        dry_run: bool,
        only: Option<&str>,
    ) -> Result<Self, SyncError> {
        let mut backends = connect(config, runner);
        if let Some(name) = only {
            backends.retain(|backend| backend.name() == name);
            if backends.is_empty() {
                return Err(SyncError::UnknownBackend {
                    name: name.to_string(),
                });
            }
        }
        Ok(Self::new(backends, dry_run))
    }

    pub fn backends(&self) -> impl Iterator<Item = &dyn Backend> {
        self.reconcilers.iter().map(Reconciler::backend)
    }
}

impl ChangeListener for Dispatcher {
    /// Stops at the first backend that fails; later backends do not see the event.
    fn on_change(&self, event: &ChangeEvent) -> Result<Vec<ReconcileReport>, SyncError> {
        self.reconcilers
            .iter()
            .map(|reconciler| reconciler.reconcile(event))
            .collect()
    }
}
