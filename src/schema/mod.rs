//! Declared record schemas
//!
//! Raw files are schema-on-read: nothing upstream guarantees their shape.
//! Each raw record type declares its fields here (name, type, required) and
//! every parsed line is validated against that declaration.
//!
//! # Coercion rules
//!
//! - `string` fields accept strings, numbers and booleans
//! - `integer` fields accept integral numbers and numeric strings
//! - `float` fields accept any number and numeric strings
//! - an empty string in a numeric field counts as absent
//! - absent or `null` required fields reject the record

mod records;
mod types;

pub use records::{RawLogRecord, RawSongRecord, SchemaRecord, NEXT_SONG_PAGE};
pub use types::{FieldSpec, FieldType, FieldValue, RecordSchema, RejectReason, ValidatedRecord};
