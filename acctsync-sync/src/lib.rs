//! # acctsync-sync
//!
//! The reconciler. Change events from the system-of-record go in; the
//! commands needed to bring each configured backend in line come out and
//! are run (or, in dry-run mode, reported).
//!
//! Implement or call [`ChangeListener`] for live events, or use
//! [`pipeline::run`] for a JSON-lines batch.

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod plan;
pub mod reconciler;

pub use dispatcher::{ChangeListener, Dispatcher};
pub use error::SyncError;
pub use plan::{plan, Desired};
pub use reconciler::{CommandResult, ReconcileReport, Reconciler};
