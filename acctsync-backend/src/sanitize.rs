//! Cleaning strings before they reach a tool's command line.
//!
//! The tools split their own arguments naively and print records
//! pipe-delimited, so free text is flattened to a single line without the
//! delimiter or control characters, and display names are length-capped.
//! Keys are never rewritten; [`key_problem`] rejects the ones that cannot be
//! transmitted safely.

use crate::tabular::FIELD_DELIMITER;

/// Appended to a display name that had to be shortened.
pub const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    max_display_name: usize,
}

impl Sanitizer {
    pub fn new(max_display_name: usize) -> Self {
        Self {
            max_display_name: max_display_name.max(TRUNCATION_MARKER.len() + 1),
        }
    }

    pub fn max_display_name(&self) -> usize {
        self.max_display_name
    }

    /// Single-line, delimiter-free, control-free, trimmed.
    pub fn field(&self, value: &str) -> String {
        let flattened: String = value
            .chars()
            .filter_map(|c| match c {
                FIELD_DELIMITER => None,
                '\n' | '\r' | '\t' => Some(' '),
                c if (c as u32) < 32 => None,
                c => Some(c),
            })
            .collect();
        flattened.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// [`field`](Self::field), then capped at the configured length with
    /// [`TRUNCATION_MARKER`] appended when anything was cut.
    pub fn display_name(&self, value: &str) -> String {
        let clean = self.field(value);
        if clean.chars().count() <= self.max_display_name {
            return clean;
        }
        let keep = self.max_display_name.saturating_sub(TRUNCATION_MARKER.len());
        let mut cut: String = clean.chars().take(keep).collect();
        cut.truncate(cut.trim_end().len());
        cut.push_str(TRUNCATION_MARKER);
        cut
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(acctsync_core::config::DEFAULT_MAX_DISPLAY_NAME)
    }
}

/// Why `key` cannot be sent to a backend, if it cannot.
///
/// Commas separate user lists and `=` separates Slurm assignments, so
/// both are refused along with whitespace, the delimiter and control bytes.
pub fn key_problem(key: &str) -> Option<&'static str> {
    problem(key, false)
}

/// Like [`key_problem`] for organization names, which may contain inner
/// spaces (they are only ever passed as a single argument).
pub fn name_problem(name: &str) -> Option<&'static str> {
    if name.trim() != name {
        return Some("name has leading or trailing whitespace");
    }
    problem(name, true)
}

fn problem(key: &str, inner_spaces: bool) -> Option<&'static str> {
    if key.is_empty() {
        return Some("key is empty");
    }
    for c in key.chars() {
        if c.is_control() {
            return Some("key contains a control character");
        }
        if c.is_whitespace() && !(inner_spaces && c == ' ') {
            return Some("key contains whitespace");
        }
        if c == FIELD_DELIMITER || c == ',' || c == '=' {
            return Some("key contains a reserved character");
        }
    }
    None
}
