//! Hive-style partition paths and row routing
//!
//! Paths look like `year=2018/month=11`. Null and empty values use
//! [`DEFAULT_PARTITION`]; `/`, `=`, `%` and control characters in values are
//! percent-escaped so every value maps to exactly one path segment.
//! An empty string therefore reads back as null; required partition columns
//! never carry one because blank required strings fail schema validation.

use super::types::{ColumnKind, PartitionKey, PartitionSpec, PartitionValue, Partitioned};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Segment value for null partition values
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

fn needs_escape(c: char) -> bool {
    matches!(c, '/' | '=' | '%' | '\\') || c.is_control()
}

/// Escape one partition value for use in a path segment
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        } else {
            out.push(c);
        }
    }
    // `.` and `..` are not valid path segments
    if out == "." || out == ".." {
        return out.replace('.', "%2E");
    }
    out
}

/// Reverse [`escape_value`]
pub fn unescape_value(segment: &str) -> Result<String> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = segment
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::output(format!("Bad escape in partition value '{segment}'")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map_err(|e| Error::output(format!("Partition value '{segment}' is not UTF-8: {e}")))
}

/// Path segment for one value
fn value_segment(value: &PartitionValue) -> String {
    match value {
        PartitionValue::Null => DEFAULT_PARTITION.to_string(),
        PartitionValue::Integer(i) => i.to_string(),
        PartitionValue::String(s) if s.is_empty() => DEFAULT_PARTITION.to_string(),
        PartitionValue::String(s) => escape_value(s),
    }
}

impl PartitionKey {
    /// Relative directory of this partition (empty for the root key)
    pub fn path(&self) -> String {
        self.values()
            .iter()
            .map(|(column, value)| format!("{column}={}", value_segment(value)))
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.path())
        }
    }
}

impl PartitionSpec {
    /// Parse a partition directory produced by [`PartitionKey::path`]
    pub fn parse_path(&self, path: &str) -> Result<PartitionKey> {
        let path = path.trim_matches('/');
        let segments: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };

        if segments.len() != self.columns.len() {
            return Err(Error::output(format!(
                "Partition path '{path}' does not match the layout of table '{}'",
                self.table
            )));
        }

        let mut key = PartitionKey::root();
        for (column, segment) in self.columns.iter().zip(segments) {
            let raw = segment
                .strip_prefix(column.name)
                .and_then(|rest| rest.strip_prefix('='))
                .ok_or_else(|| {
                    Error::output(format!(
                        "Expected column '{}' in partition path '{path}'",
                        column.name
                    ))
                })?;

            let value = if raw == DEFAULT_PARTITION {
                PartitionValue::Null
            } else {
                match column.kind {
                    ColumnKind::Integer => raw.parse::<i64>().map(PartitionValue::Integer).map_err(
                        |e| Error::output(format!("Bad integer '{raw}' for '{}': {e}", column.name)),
                    )?,
                    ColumnKind::String => PartitionValue::String(unescape_value(raw)?),
                }
            };
            key = key.with(column.name, value);
        }
        Ok(key)
    }
}

/// Group rows by partition, keeping row order inside each partition
///
/// Partitions come out in key order.
pub fn route<R: Partitioned + Clone>(rows: &[R]) -> BTreeMap<PartitionKey, Vec<R>> {
    let mut partitions: BTreeMap<PartitionKey, Vec<R>> = BTreeMap::new();
    for row in rows {
        partitions
            .entry(row.partition_key())
            .or_default()
            .push(row.clone());
    }
    partitions
}
