//! Output partitioning
//!
//! Each table has a fixed partition layout:
//! - `songs`: `year`, `artist_id`
//! - `time`, `songplays`: `year`, `month`
//! - `users`, `artists`: unpartitioned
//!
//! Partition columns live in the directory names only, never inside the
//! data files.

mod routers;
mod types;

pub use routers::{escape_value, route, unescape_value, DEFAULT_PARTITION};
pub use types::{
    ColumnKind, PartitionColumn, PartitionKey, PartitionSpec, PartitionValue, Partitioned,
};

#[cfg(test)]
mod tests;
