//! acctsync backend library: talking to accounting tools.
//!
//! - [`runner`]: process spawning and the diagnostic sink
//! - [`client`]: exit-code handling and pipe-delimited queries
//! - [`adapter`]: the [`Backend`] trait and [`connect`]
//! - [`gold`], [`slurm`]: the two adapters

pub mod adapter;
pub mod client;
pub mod command;
pub mod error;
pub mod gold;
pub mod log_rotation;
pub mod runner;
pub mod sanitize;
pub mod slurm;
pub mod tabular;

pub use adapter::{connect, process_runner, Backend};
pub use client::{Client, ExecOutcome, HeaderPolicy};
pub use command::{BackendCommand, Invocation, ToolLayout};
pub use error::BackendError;
pub use gold::GoldBackend;
pub use runner::{Captured, CommandRunner, DiagnosticSink, ProcessRunner};
pub use sanitize::Sanitizer;
pub use slurm::SlurmBackend;
pub use tabular::BackendRecord;
