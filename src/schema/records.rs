//! Raw record types and their declared schemas
//!
//! Field names and types follow the upstream files: catalog files carry one
//! song per line, event files carry one listening event per line.

use super::types::{FieldSpec, FieldType, RecordSchema, ValidatedRecord};
use crate::types::OptionStringExt;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Page value marking a play event
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// A record type that can be built from a validated raw object
pub trait SchemaRecord: Sized + Send + 'static {
    /// Declared schema for this record type
    fn schema() -> &'static RecordSchema;

    /// Build the typed record from a validated object
    fn from_validated(record: &ValidatedRecord) -> Self;
}

// ============================================================================
// Catalog Records
// ============================================================================

static SONG_SCHEMA: Lazy<RecordSchema> = Lazy::new(|| {
    RecordSchema::new(
        "song_data",
        vec![
            FieldSpec::required("song_id", FieldType::String),
            FieldSpec::required("title", FieldType::String),
            FieldSpec::required("artist_id", FieldType::String),
            FieldSpec::optional("artist_name", FieldType::String),
            FieldSpec::optional("artist_location", FieldType::String),
            FieldSpec::optional("artist_latitude", FieldType::Float),
            FieldSpec::optional("artist_longitude", FieldType::Float),
            FieldSpec::optional("duration", FieldType::Float),
            FieldSpec::optional("year", FieldType::Integer),
            FieldSpec::optional("num_songs", FieldType::Integer),
        ],
    )
});

/// One song from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub artist_name: Option<String>,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
    pub duration: Option<f64>,
    pub year: Option<i64>,
    pub num_songs: Option<i64>,
}

impl SchemaRecord for RawSongRecord {
    fn schema() -> &'static RecordSchema {
        &SONG_SCHEMA
    }

    fn from_validated(r: &ValidatedRecord) -> Self {
        Self {
            song_id: r.required_string("song_id"),
            title: r.required_string("title"),
            artist_id: r.required_string("artist_id"),
            artist_name: r.string("artist_name"),
            artist_location: r.string("artist_location").none_if_empty(),
            artist_latitude: r.float("artist_latitude"),
            artist_longitude: r.float("artist_longitude"),
            duration: r.float("duration"),
            year: r.integer("year"),
            num_songs: r.integer("num_songs"),
        }
    }
}

// ============================================================================
// Event Records
// ============================================================================

static LOG_SCHEMA: Lazy<RecordSchema> = Lazy::new(|| {
    RecordSchema::new(
        "log_data",
        vec![
            FieldSpec::required("ts", FieldType::Integer),
            FieldSpec::required("page", FieldType::String),
            FieldSpec::optional("userId", FieldType::String),
            FieldSpec::optional("firstName", FieldType::String),
            FieldSpec::optional("lastName", FieldType::String),
            FieldSpec::optional("gender", FieldType::String),
            FieldSpec::optional("level", FieldType::String),
            FieldSpec::optional("song", FieldType::String),
            FieldSpec::optional("artist", FieldType::String),
            FieldSpec::optional("length", FieldType::Float),
            FieldSpec::optional("sessionId", FieldType::Integer),
            FieldSpec::optional("location", FieldType::String),
            FieldSpec::optional("userAgent", FieldType::String),
            FieldSpec::optional("auth", FieldType::String),
            FieldSpec::optional("itemInSession", FieldType::Integer),
            FieldSpec::optional("method", FieldType::String),
            FieldSpec::optional("registration", FieldType::Float),
            FieldSpec::optional("status", FieldType::Integer),
        ],
    )
});

/// One event from the activity log
///
/// Field names are snake_case here; the raw keys are camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLogRecord {
    /// Epoch milliseconds
    pub ts: i64,
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub page: String,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl RawLogRecord {
    /// Whether this event is a song play
    pub fn is_play(&self) -> bool {
        self.page == NEXT_SONG_PAGE
    }

    /// The event instant, if `ts` is a representable timestamp
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.ts)
    }
}

impl SchemaRecord for RawLogRecord {
    fn schema() -> &'static RecordSchema {
        &LOG_SCHEMA
    }

    fn from_validated(r: &ValidatedRecord) -> Self {
        Self {
            ts: r.integer("ts").unwrap_or_default(),
            user_id: r.string("userId").none_if_empty(),
            first_name: r.string("firstName"),
            last_name: r.string("lastName"),
            gender: r.string("gender"),
            level: r.string("level"),
            page: r.required_string("page"),
            song: r.string("song"),
            artist: r.string("artist"),
            length: r.float("length"),
            session_id: r.integer("sessionId"),
            location: r.string("location"),
            user_agent: r.string("userAgent"),
        }
    }
}
