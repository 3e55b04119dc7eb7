//! Partition manifests
//!
//! A manifest names the data files that make up one partition. Writing it is
//! the commit point of a partition rewrite: readers resolve a partition
//! through its manifest and ignore any other file in the directory.

use crate::error::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the manifest inside a partition directory
pub const MANIFEST_FILE: &str = "_manifest.json";

/// Committed contents of one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionManifest {
    /// Run that wrote the partition
    pub run_id: String,
    /// Table name
    pub table: String,
    /// Partition path relative to the table (empty when unpartitioned)
    pub partition: String,
    /// Data file names relative to the partition directory
    pub files: Vec<String>,
    /// Total rows across `files`
    pub rows: usize,
    /// When the partition was committed
    pub committed_at: DateTime<Utc>,
}

impl PartitionManifest {
    /// Serialize for storage
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec_pretty(self)?))
    }

    /// Parse a stored manifest
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| Error::output(format!("Invalid partition manifest: {e}")))
    }

    /// Whether `file` is one of this manifest's data files
    pub fn contains(&self, file: &str) -> bool {
        self.files.iter().any(|f| f == file)
    }
}

/// Join a partition directory and a file name
pub fn partition_key(table: &str, partition: &str, file: &str) -> String {
    if partition.is_empty() {
        format!("{table}/{file}")
    } else {
        format!("{table}/{partition}/{file}")
    }
}
