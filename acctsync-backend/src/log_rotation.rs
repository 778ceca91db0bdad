//! Size-based rotation for the command log.
//!
//! The command log only grows (every spawned tool appends to it), so it is
//! rotated before each invocation once it passes [`MAX_LOG_BYTES`]:
//!   commands.log → commands.log.1 → … → commands.log.5 (dropped)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Rotate once the live file reaches 10 MiB.
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Numbered copies kept after rotation.
pub const MAX_ROTATED_FILES: usize = 5;

/// Rotate `log_path` if it is at least `max_bytes` long.
///
/// Returns `true` if rotation occurred. A missing file is not an error.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, keep: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes || keep == 0 {
        return Ok(false);
    }

    let oldest = numbered(log_path, keep);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..keep).rev() {
        let from = numbered(log_path, n);
        if from.exists() {
            fs::rename(&from, numbered(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, numbered(log_path, 1))?;
    Ok(true)
}

/// Rotate the command log with the default limits, logging the outcome.
pub fn rotate_command_log(log_path: &Path) {
    match rotate_if_needed(log_path, MAX_LOG_BYTES, MAX_ROTATED_FILES) {
        Ok(true) => tracing::info!("rotated command log {}", log_path.display()),
        Ok(false) => {}
        Err(err) => tracing::warn!("command log rotation failed for {}: {err}", log_path.display()),
    }
}

/// `commands.log` → `commands.log.<n>`
fn numbered(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("commands.log");
    base.with_file_name(format!("{name}.{n}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn small_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("commands.log");
        fs::write(&log, "Call: glsuser\n").unwrap();
        assert!(!rotate_if_needed(&log, 1024, 3).unwrap());
        assert!(!numbered(&log, 1).exists());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!rotate_if_needed(&dir.path().join("absent.log"), 1, 3).unwrap());
    }

    #[test]
    fn oversized_file_moves_to_first_copy() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("commands.log");
        fs::write(&log, vec![b'x'; 64]).unwrap();

        assert!(rotate_if_needed(&log, 32, 3).unwrap());
        assert!(!log.exists(), "live log is recreated by the next append");
        assert_eq!(fs::metadata(numbered(&log, 1)).unwrap().len(), 64);
    }

    #[test]
    fn copies_shift_and_oldest_is_dropped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("commands.log");

        for round in 1..=4u8 {
            fs::write(&log, vec![b'0' + round; 64]).unwrap();
            rotate_if_needed(&log, 32, 3).unwrap();
        }

        assert!(numbered(&log, 3).exists());
        assert!(!numbered(&log, 4).exists(), "only `keep` copies survive");
        let newest = fs::read(numbered(&log, 1)).unwrap();
        assert_eq!(newest[0], b'4');
    }
}
