//! Pipe-delimited query output.
//!
//! Both tools print a header row followed by one row per record, fields
//! separated by [`FIELD_DELIMITER`]. Slurm's parsable mode also ends every
//! line with a delimiter; [`ParseOptions::trailing_delimiter`] strips it.
//! No quoting is understood: values never contain the delimiter because
//! everything written to the backends is sanitized first.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::BackendError;

pub const FIELD_DELIMITER: char = '|';

/// One row of query output: header name → field value, in header order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackendRecord {
    fields: Vec<(String, String)>,
}

impl BackendRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`get`](Self::get) but a missing column is an error naming `command`.
    pub fn require(&self, field: &str, command: &str) -> Result<&str, BackendError> {
        self.get(field).ok_or_else(|| BackendError::MissingField {
            field: field.to_string(),
            command: command.to_string(),
        })
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Value of the first column, which both tools use as the record name.
    pub fn first_value(&self) -> Option<&str> {
        self.fields.first().map(|(_, value)| value.as_str())
    }
}

impl Serialize for BackendRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Every line ends with one extra delimiter that carries no field.
    pub trailing_delimiter: bool,
}

/// Parsed output: the header row and the records under it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<BackendRecord>,
}

impl Table {
    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Key rows by their lowercased first column.
    ///
    /// Two rows with the same key are a [`BackendError::DuplicateRecord`].
    pub fn into_keyed(self) -> Result<BTreeMap<String, BackendRecord>, BackendError> {
        let mut keyed = BTreeMap::new();
        for row in self.rows {
            let key = row.first_value().unwrap_or_default().to_lowercase();
            if keyed.contains_key(&key) {
                return Err(BackendError::DuplicateRecord { key });
            }
            keyed.insert(key, row);
        }
        Ok(keyed)
    }
}

/// Parse query output into a [`Table`].
///
/// Empty output yields a table with no headers and no rows. A row with fewer
/// fields than the header is a [`BackendError::MalformedRow`]; extra trailing
/// fields are dropped with a warning.
pub fn parse(text: &str, options: ParseOptions) -> Result<Table, BackendError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header_line)) = lines.next() else {
        return Ok(Table::default());
    };
    let headers: Vec<String> = split(header_line, options)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, line) in lines {
        let values = split(line, options);
        if values.len() < headers.len() {
            return Err(BackendError::MalformedRow {
                line: index + 1,
                expected: headers.len(),
                found: values.len(),
            });
        }
        if values.len() > headers.len() {
            tracing::warn!(
                "row {} has {} fields for {} headers; dropping the extras",
                index + 1,
                values.len(),
                headers.len()
            );
        }
        rows.push(BackendRecord::from_pairs(
            headers.iter().cloned().zip(values.into_iter().map(str::to_string)),
        ));
    }

    Ok(Table { headers, rows })
}

fn split(line: &str, options: ParseOptions) -> Vec<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let line = if options.trailing_delimiter {
        line.strip_suffix(FIELD_DELIMITER).unwrap_or(line)
    } else {
        line
    };
    line.split(FIELD_DELIMITER).collect()
}
