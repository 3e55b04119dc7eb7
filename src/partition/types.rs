//! Partition types and traits
//!
//! A table's [`PartitionSpec`] names its partition columns; each row yields a
//! [`PartitionKey`] holding one [`PartitionValue`] per column.

use crate::transform::{ArtistDim, SongDim, SongPlayFact, TimeDim, UserDim};
use crate::types::Table;
use chrono::Datelike;
use serde_json::Value;

/// Type of a partition column, used when reading values back from paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    String,
}

/// One partition column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionColumn {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl PartitionColumn {
    const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
        }
    }

    const fn string(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::String,
        }
    }
}

const SONGS_COLUMNS: &[PartitionColumn] = &[
    PartitionColumn::integer("year"),
    PartitionColumn::string("artist_id"),
];

const YEAR_MONTH_COLUMNS: &[PartitionColumn] = &[
    PartitionColumn::integer("year"),
    PartitionColumn::integer("month"),
];

/// Partition layout of one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSpec {
    pub table: Table,
    pub columns: &'static [PartitionColumn],
}

impl PartitionSpec {
    /// Layout used for each output table
    pub fn for_table(table: Table) -> Self {
        let columns = match table {
            Table::Songs => SONGS_COLUMNS,
            Table::Time | Table::Songplays => YEAR_MONTH_COLUMNS,
            Table::Users | Table::Artists => &[],
        };
        Self { table, columns }
    }

    /// Whether the table is written as a single partition
    pub fn is_unpartitioned(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether `name` is a partition column of this table
    pub fn is_partition_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// A single partition column value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartitionValue {
    Null,
    Integer(i64),
    String(String),
}

impl PartitionValue {
    /// As a JSON value, for reading rows back
    pub fn to_json(&self) -> Value {
        match self {
            PartitionValue::Null => Value::Null,
            PartitionValue::Integer(i) => Value::from(*i),
            PartitionValue::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<i64> for PartitionValue {
    fn from(value: i64) -> Self {
        PartitionValue::Integer(value)
    }
}

impl From<i32> for PartitionValue {
    fn from(value: i32) -> Self {
        PartitionValue::Integer(i64::from(value))
    }
}

impl From<u32> for PartitionValue {
    fn from(value: u32) -> Self {
        PartitionValue::Integer(i64::from(value))
    }
}

impl From<&str> for PartitionValue {
    fn from(value: &str) -> Self {
        PartitionValue::String(value.to_string())
    }
}

impl<T: Into<PartitionValue>> From<Option<T>> for PartitionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PartitionValue::Null, Into::into)
    }
}

/// Column/value pairs naming one partition
///
/// Ordering follows the column order, so keys sort the way their paths do
/// for fixed-width values.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    values: Vec<(&'static str, PartitionValue)>,
}

impl PartitionKey {
    /// Key of an unpartitioned table
    pub fn root() -> Self {
        Self::default()
    }

    /// Add a column value
    #[must_use]
    pub fn with(mut self, column: &'static str, value: impl Into<PartitionValue>) -> Self {
        self.values.push((column, value.into()));
        self
    }

    /// Column/value pairs
    pub fn values(&self) -> &[(&'static str, PartitionValue)] {
        &self.values
    }

    /// Whether this is the root key of an unpartitioned table
    pub fn is_root(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of one column
    pub fn get(&self, column: &str) -> Option<&PartitionValue> {
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

/// A row that belongs to exactly one partition of its table
pub trait Partitioned {
    /// Table the row is written to
    const TABLE: Table;

    /// The row's partition
    fn partition_key(&self) -> PartitionKey;
}

// ============================================================================
// Table Layouts
// ============================================================================

impl Partitioned for SongDim {
    const TABLE: Table = Table::Songs;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::root()
            .with("year", self.year)
            .with("artist_id", self.artist_id.as_str())
    }
}

impl Partitioned for ArtistDim {
    const TABLE: Table = Table::Artists;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::root()
    }
}

impl Partitioned for UserDim {
    const TABLE: Table = Table::Users;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::root()
    }
}

impl Partitioned for TimeDim {
    const TABLE: Table = Table::Time;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::root()
            .with("year", self.year)
            .with("month", self.month)
    }
}

impl Partitioned for SongPlayFact {
    const TABLE: Table = Table::Songplays;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::root()
            .with("year", self.start_time.year())
            .with("month", self.start_time.month())
    }
}
