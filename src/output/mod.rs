//! Output module
//!
//! Turns star-schema rows into partitioned Parquet tables on object storage.
//!
//! # Overview
//!
//! This module provides:
//! - Arrow schemas for the five tables ([`TableRow`])
//! - In-memory Parquet encoding ([`encode_parquet`])
//! - Stage-then-swap partition replacement ([`PartitionedWriter`])
//! - Manifest-based reads of committed tables ([`read_table`])

mod manifest;
mod partitioned;
mod reader;
mod schema;
mod writer;

pub use manifest::{PartitionManifest, MANIFEST_FILE};
pub use partitioned::{new_run_id, PartitionWrite, PartitionedWriter, TableWrite, STAGING_DIR};
pub use reader::{read_table, summarize_table, table_manifests, TableSummary};
pub use schema::{arrow_to_json, TableRow, TIMESTAMP_TZ};
pub use writer::{decode_parquet, encode_parquet, ParquetWriter, ParquetWriterConfig};
