//! Arrow schemas of the output tables and Arrow/JSON conversion
//!
//! Data files carry every column except the table's partition columns,
//! which live in the directory names.

use crate::error::{Error, Result};
use crate::partition::Partitioned;
use crate::transform::{ArtistDim, SongDim, SongPlayFact, TimeDim, UserDim};
use arrow::array::{
    Array, ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, SecondsFormat};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

/// Time zone tag on every timestamp column
pub const TIMESTAMP_TZ: &str = "UTC";

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some(TIMESTAMP_TZ.into()))
}

/// A row type with a fixed Arrow layout
pub trait TableRow: Partitioned + Clone + Send + Sync + 'static {
    /// Schema of the data files (partition columns excluded)
    fn data_schema() -> SchemaRef;

    /// Convert rows to one batch matching [`TableRow::data_schema`]
    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;
}

fn batch(schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    RecordBatch::try_new(schema, columns).map_err(Error::from)
}

fn strings<'a, R: 'a>(rows: &'a [R], f: impl Fn(&'a R) -> Option<&'a str>) -> ArrayRef {
    Arc::new(rows.iter().map(f).collect::<StringArray>())
}

fn timestamps<R>(rows: &[R], f: impl Fn(&R) -> i64) -> ArrayRef {
    Arc::new(
        TimestampMillisecondArray::from(rows.iter().map(f).collect::<Vec<_>>())
            .with_timezone(TIMESTAMP_TZ),
    )
}

// ============================================================================
// Songs
// ============================================================================

static SONGS_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("song_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("duration", DataType::Float64, true),
    ]))
});

impl TableRow for SongDim {
    fn data_schema() -> SchemaRef {
        Arc::clone(&SONGS_SCHEMA)
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        batch(
            Self::data_schema(),
            vec![
                strings(rows, |r| Some(r.song_id.as_str())),
                strings(rows, |r| Some(r.title.as_str())),
                Arc::new(rows.iter().map(|r| r.duration).collect::<Float64Array>()),
            ],
        )
    }
}

// ============================================================================
// Artists
// ============================================================================

static ARTISTS_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("artist_id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("latitude", DataType::Float64, true),
        Field::new("longitude", DataType::Float64, true),
    ]))
});

impl TableRow for ArtistDim {
    fn data_schema() -> SchemaRef {
        Arc::clone(&ARTISTS_SCHEMA)
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        batch(
            Self::data_schema(),
            vec![
                strings(rows, |r| Some(r.artist_id.as_str())),
                strings(rows, |r| r.name.as_deref()),
                strings(rows, |r| r.location.as_deref()),
                Arc::new(rows.iter().map(|r| r.latitude).collect::<Float64Array>()),
                Arc::new(rows.iter().map(|r| r.longitude).collect::<Float64Array>()),
            ],
        )
    }
}

// ============================================================================
// Users
// ============================================================================

static USERS_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("user_id", DataType::Utf8, false),
        Field::new("first_name", DataType::Utf8, true),
        Field::new("last_name", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
    ]))
});

impl TableRow for UserDim {
    fn data_schema() -> SchemaRef {
        Arc::clone(&USERS_SCHEMA)
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        batch(
            Self::data_schema(),
            vec![
                strings(rows, |r| Some(r.user_id.as_str())),
                strings(rows, |r| r.first_name.as_deref()),
                strings(rows, |r| r.last_name.as_deref()),
                strings(rows, |r| r.gender.as_deref()),
                strings(rows, |r| r.level.as_deref()),
            ],
        )
    }
}

// ============================================================================
// Time
// ============================================================================

static TIME_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("start_time", timestamp_type(), false),
        Field::new("hour", DataType::Int32, false),
        Field::new("day", DataType::Int32, false),
        Field::new("week", DataType::Int32, false),
        Field::new("weekday", DataType::Int32, false),
    ]))
});

fn int32s<R>(rows: &[R], f: impl Fn(&R) -> u32) -> Result<ArrayRef> {
    let values = rows
        .iter()
        .map(|r| i32::try_from(f(r)))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::output(format!("Calendar field out of range: {e}")))?;
    Ok(Arc::new(Int32Array::from(values)))
}

impl TableRow for TimeDim {
    fn data_schema() -> SchemaRef {
        Arc::clone(&TIME_SCHEMA)
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        batch(
            Self::data_schema(),
            vec![
                timestamps(rows, |r| r.start_time.timestamp_millis()),
                int32s(rows, |r| r.hour)?,
                int32s(rows, |r| r.day)?,
                int32s(rows, |r| r.week)?,
                int32s(rows, |r| r.weekday)?,
            ],
        )
    }
}

// ============================================================================
// Songplays
// ============================================================================

static SONGPLAYS_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("songplay_id", DataType::Int64, false),
        Field::new("start_time", timestamp_type(), false),
        Field::new("user_id", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("song_id", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("session_id", DataType::Int64, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("user_agent", DataType::Utf8, true),
    ]))
});

impl TableRow for SongPlayFact {
    fn data_schema() -> SchemaRef {
        Arc::clone(&SONGPLAYS_SCHEMA)
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        batch(
            Self::data_schema(),
            vec![
                Arc::new(Int64Array::from(
                    rows.iter().map(|r| r.songplay_id).collect::<Vec<_>>(),
                )),
                timestamps(rows, |r| r.start_time.timestamp_millis()),
                strings(rows, |r| r.user_id.as_deref()),
                strings(rows, |r| r.level.as_deref()),
                strings(rows, |r| r.song_id.as_deref()),
                strings(rows, |r| r.artist_id.as_deref()),
                Arc::new(rows.iter().map(|r| r.session_id).collect::<Int64Array>()),
                strings(rows, |r| r.location.as_deref()),
                strings(rows, |r| r.user_agent.as_deref()),
            ],
        )
    }
}

// ============================================================================
// Arrow to JSON
// ============================================================================

/// Convert an Arrow RecordBatch to JSON records
///
/// Returns a vector of JSON objects, one per row in the batch.
pub fn arrow_to_json(batch: &RecordBatch) -> Result<Vec<serde_json::Map<String, Value>>> {
    let schema = batch.schema();
    let num_rows = batch.num_rows();
    let mut records = Vec::with_capacity(num_rows);

    for row_idx in 0..num_rows {
        let mut record = serde_json::Map::new();

        for (col_idx, field) in schema.fields().iter().enumerate() {
            let column = batch.column(col_idx);
            let value = array_value_to_json(column.as_ref(), row_idx)?;
            record.insert(field.name().clone(), value);
        }

        records.push(record);
    }

    Ok(records)
}

fn downcast<'a, T: 'static>(array: &'a dyn Array, name: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::output(format!("Failed to downcast to {name}")))
}

/// Convert a single array element to JSON
fn array_value_to_json(array: &dyn Array, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    match array.data_type() {
        DataType::Null => Ok(Value::Null),

        DataType::Int32 => {
            let arr = downcast::<Int32Array>(array, "Int32Array")?;
            Ok(Value::Number(arr.value(row).into()))
        }

        DataType::Int64 => {
            let arr = downcast::<Int64Array>(array, "Int64Array")?;
            Ok(Value::Number(arr.value(row).into()))
        }

        DataType::Float64 => {
            let arr = downcast::<Float64Array>(array, "Float64Array")?;
            let val = arr.value(row);
            Ok(serde_json::Number::from_f64(val).map_or(Value::Null, Value::Number))
        }

        DataType::Utf8 => {
            let arr = downcast::<StringArray>(array, "StringArray")?;
            Ok(Value::String(arr.value(row).to_string()))
        }

        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            let arr = downcast::<TimestampMillisecondArray>(array, "TimestampMillisecondArray")?;
            let ms = arr.value(row);
            DateTime::from_timestamp_millis(ms)
                .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)))
                .ok_or_else(|| Error::output(format!("Timestamp out of range: {ms}")))
        }

        other => Err(Error::output(format!(
            "Unsupported column type in output table: {other:?}"
        ))),
    }
}
