//! Partitioned table writer
//!
//! Each partition is replaced with a stage-then-swap sequence:
//!
//! 1. encode the whole partition to Parquet in memory
//! 2. put it under `_staging/<run_id>/...`
//! 3. copy it to `<table>/<partition>/part-00000-<run_id>.parquet`
//! 4. commit by putting `<table>/<partition>/_manifest.json`
//! 5. delete files the new manifest does not name, and the staged object
//!
//! A failure before step 4 leaves the previous manifest, and therefore the
//! previous partition contents, in place. Partitions that receive no rows in
//! a run are not touched.

use super::manifest::{partition_key, PartitionManifest, MANIFEST_FILE};
use super::schema::TableRow;
use super::writer::{encode_parquet, ParquetWriterConfig};
use crate::error::{Error, Result};
use crate::partition::{route, PartitionKey, PartitionSpec};
use crate::store::LakeStore;
use crate::types::Table;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

/// Prefix under the output root for staged objects
pub const STAGING_DIR: &str = "_staging";

/// Result of writing one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionWrite {
    /// Partition path relative to the table
    pub partition: String,
    /// Rows written
    pub rows: usize,
    /// Committed data file
    pub file: String,
    /// Stale files removed after commit
    pub removed: usize,
}

/// Result of writing one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableWrite {
    pub table: Table,
    pub rows: usize,
    pub partitions: Vec<PartitionWrite>,
}

/// Writes tables below one output root
#[derive(Debug, Clone)]
pub struct PartitionedWriter {
    store: LakeStore,
    parquet: ParquetWriterConfig,
    run_id: String,
}

/// Default run id: a UTC timestamp that sorts in write order
pub fn new_run_id() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%3fZ").to_string()
}

impl PartitionedWriter {
    /// Create a writer with a fresh run id
    pub fn new(store: LakeStore, parquet: ParquetWriterConfig) -> Self {
        Self {
            store,
            parquet,
            run_id: new_run_id(),
        }
    }

    /// Override the run id
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Run id used in file names
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Output root
    pub fn store(&self) -> &LakeStore {
        &self.store
    }

    /// Write every partition that has rows
    ///
    /// Unpartitioned tables are always rewritten, even when empty.
    pub async fn write_table<R: TableRow>(&self, rows: &[R]) -> Result<TableWrite> {
        let table = R::TABLE;
        let mut routed = route(rows);
        if routed.is_empty() && PartitionSpec::for_table(table).is_unpartitioned() {
            routed.insert(PartitionKey::root(), Vec::new());
        }

        let mut partitions = Vec::with_capacity(routed.len());
        for (key, part_rows) in &routed {
            partitions.push(self.write_partition(table, key, part_rows).await?);
        }

        info!(
            table = %table,
            rows = rows.len(),
            partitions = partitions.len(),
            "Wrote table"
        );

        Ok(TableWrite {
            table,
            rows: rows.len(),
            partitions,
        })
    }

    /// Replace one partition
    pub async fn write_partition<R: TableRow>(
        &self,
        table: Table,
        key: &PartitionKey,
        rows: &[R],
    ) -> Result<PartitionWrite> {
        let partition = key.path();
        self.swap_partition(table, &partition, rows)
            .await
            .map_err(|e| match e {
                already @ Error::PartitionWrite { .. } => already,
                other => Error::partition_write(table.name(), key.to_string(), other.to_string()),
            })
    }

    async fn swap_partition<R: TableRow>(
        &self,
        table: Table,
        partition: &str,
        rows: &[R],
    ) -> Result<PartitionWrite> {
        let table_name = table.name();
        let batch = R::to_batch(rows)?;
        let data = encode_parquet(&batch, &self.parquet)?;

        let staged = partition_key(
            &format!("{STAGING_DIR}/{}/{table_name}", self.run_id),
            partition,
            "part-00000.parquet",
        );
        let file = format!("part-00000-{}.parquet", self.run_id);
        let target = partition_key(table_name, partition, &file);

        self.store.put(&staged, data).await?;
        self.store.copy(&staged, &target).await?;

        let manifest = PartitionManifest {
            run_id: self.run_id.clone(),
            table: table_name.to_string(),
            partition: partition.to_string(),
            files: vec![file.clone()],
            rows: rows.len(),
            committed_at: Utc::now(),
        };
        self.store
            .put(
                &partition_key(table_name, partition, MANIFEST_FILE),
                manifest.to_bytes()?,
            )
            .await?;

        let removed = self.remove_stale(table_name, partition, &manifest).await?;
        self.store.delete(&staged).await?;

        debug!(
            table = table_name,
            partition,
            rows = rows.len(),
            removed,
            "Committed partition"
        );

        Ok(PartitionWrite {
            partition: partition.to_string(),
            rows: rows.len(),
            file,
            removed,
        })
    }

    /// Delete data files in a partition directory that `manifest` does not name
    async fn remove_stale(
        &self,
        table: &str,
        partition: &str,
        manifest: &PartitionManifest,
    ) -> Result<usize> {
        let dir = if partition.is_empty() {
            table.to_string()
        } else {
            format!("{table}/{partition}")
        };

        let mut removed = 0;
        for key in self.store.list(Some(&dir)).await? {
            let Some(name) = key
                .strip_prefix(&dir)
                .and_then(|rest| rest.strip_prefix('/'))
            else {
                continue;
            };
            // files of nested partitions are not ours
            if name.contains('/') || name == MANIFEST_FILE || manifest.contains(name) {
                continue;
            }
            self.store.delete(&key).await?;
            removed += 1;
        }
        Ok(removed)
    }
}
