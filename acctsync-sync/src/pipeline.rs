//! Shared entrypoint: read a batch of events and dispatch them in order.

use std::io;
use std::path::{Path, PathBuf};

use acctsync_core::{ChangeEvent, Config};

use crate::dispatcher::{ChangeListener, Dispatcher};
use crate::error::SyncError;
use crate::events::{read_events, read_events_from};
use crate::reconciler::ReconcileReport;

/// Where a batch of JSON-lines events comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    Stdin,
    File(PathBuf),
}

impl EventSource {
    pub fn read(&self) -> Result<Vec<ChangeEvent>, SyncError> {
        match self {
            EventSource::Stdin => read_events(io::stdin().lock(), Path::new("<stdin>")),
            EventSource::File(path) => read_events_from(path),
        }
    }
}

/// Options for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Restrict to the backend with this name.
    pub backend: Option<String>,
}

/// Read events from `source` and reconcile them against the configured backends.
pub fn run(
    config: &Config,
    source: &EventSource,
    options: &RunOptions,
) -> Result<Vec<ReconcileReport>, SyncError> {
    let events = source.read()?;
    let dispatcher = Dispatcher::from_config(config, options.dry_run, options.backend.as_deref())?;
    apply(&dispatcher, &events)
}

/// Hand each event to `listener` in receipt order, stopping at the first error.
pub fn apply(
    listener: &dyn ChangeListener,
    events: &[ChangeEvent],
) -> Result<Vec<ReconcileReport>, SyncError> {
    let mut reports = Vec::new();
    for event in events {
        reports.extend(listener.on_change(event)?);
    }
    tracing::debug!("dispatched {} event(s), {} report(s)", events.len(), reports.len());
    Ok(reports)
}
