//! JSON-lines change events.
//!
//! One serialized [`ChangeEvent`] per line. Blank lines and lines starting
//! with `#` are skipped, so a spooled batch can carry comments.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use acctsync_core::ChangeEvent;

use crate::error::{io_err, SyncError};

/// Parse every event in `reader`, in order.
pub fn read_events<R: BufRead>(reader: R, origin: &Path) -> Result<Vec<ChangeEvent>, SyncError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| io_err(origin, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|source| SyncError::Events {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    tracing::debug!("read {} event(s) from {}", events.len(), origin.display());
    Ok(events)
}

pub fn read_events_from(path: &Path) -> Result<Vec<ChangeEvent>, SyncError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    read_events(BufReader::new(file), path)
}

/// Serialize `events` as JSON lines.
pub fn write_events(events: &[ChangeEvent]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for event in events {
        out.push_str(&serde_json::to_string(event)?);
        out.push('\n');
    }
    Ok(out)
}
