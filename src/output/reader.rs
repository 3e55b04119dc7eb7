//! Reading committed tables back
//!
//! Only files named by a partition manifest are read, so the result is
//! always the last committed state of each partition.

use super::manifest::{partition_key, PartitionManifest, MANIFEST_FILE};
use super::schema::arrow_to_json;
use super::writer::decode_parquet;
use crate::error::Result;
use crate::partition::PartitionSpec;
use crate::store::LakeStore;
use crate::types::{JsonObject, Table};
use serde::Serialize;
use tracing::debug;

/// Row and partition counts of one committed table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub partitions: usize,
    pub rows: usize,
}

/// Every committed manifest of a table, in partition path order
pub async fn table_manifests(store: &LakeStore, table: Table) -> Result<Vec<PartitionManifest>> {
    let suffix = format!("/{MANIFEST_FILE}");
    let mut manifests = Vec::new();
    for key in store.list(Some(table.name())).await? {
        if key.ends_with(&suffix) {
            manifests.push(PartitionManifest::from_bytes(&store.get(&key).await?)?);
        }
    }
    Ok(manifests)
}

/// Count rows from manifests without reading data files
pub async fn summarize_table(store: &LakeStore, table: Table) -> Result<TableSummary> {
    let manifests = table_manifests(store, table).await?;
    Ok(TableSummary {
        table: table.name().to_string(),
        partitions: manifests.len(),
        rows: manifests.iter().map(|m| m.rows).sum(),
    })
}

/// Read every committed row of a table
///
/// Partition columns are restored from the partition path.
pub async fn read_table(store: &LakeStore, table: Table) -> Result<Vec<JsonObject>> {
    let spec = PartitionSpec::for_table(table);
    let mut rows = Vec::new();

    for manifest in table_manifests(store, table).await? {
        let key = spec.parse_path(&manifest.partition)?;
        for file in &manifest.files {
            let data = store
                .get(&partition_key(table.name(), &manifest.partition, file))
                .await?;
            for batch in decode_parquet(data)? {
                for mut row in arrow_to_json(&batch)? {
                    for (column, value) in key.values() {
                        row.insert((*column).to_string(), value.to_json());
                    }
                    rows.push(row);
                }
            }
        }
        debug!(table = %table, partition = %manifest.partition, "Read partition");
    }

    Ok(rows)
}
