//! Star-schema row types
//!
//! Every row is derived from raw records and written once per run.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// `songs` row, keyed by `song_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongDim {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: Option<i64>,
    pub duration: Option<f64>,
}

/// `artists` row, keyed by `artist_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistDim {
    pub artist_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// `users` row, keyed by `user_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDim {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

/// `time` row, keyed by `start_time`
///
/// Every field after the key is a pure function of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDim {
    pub start_time: DateTime<Utc>,
    pub hour: u32,
    pub day: u32,
    /// ISO 8601 week of the year
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// 1 = Sunday through 7 = Saturday
    pub weekday: u32,
}

impl TimeDim {
    /// Break a UTC instant into calendar parts
    pub fn from_instant(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            hour: start_time.hour(),
            day: start_time.day(),
            week: start_time.iso_week().week(),
            month: start_time.month(),
            year: start_time.year(),
            weekday: start_time.weekday().number_from_sunday(),
        }
    }
}

/// `songplays` row, one per play event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongPlayFact {
    /// Dense key starting at 1, assigned after all facts are collected
    pub songplay_id: i64,
    pub start_time: DateTime<Utc>,
    pub user_id: Option<String>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Every table produced by one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StarSchema {
    pub songs: Vec<SongDim>,
    pub artists: Vec<ArtistDim>,
    pub users: Vec<UserDim>,
    pub time: Vec<TimeDim>,
    pub songplays: Vec<SongPlayFact>,
}

/// Counters from the transform stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    /// Catalog records seen
    pub song_records: usize,
    /// Event records seen
    pub event_records: usize,
    /// Play events turned into facts
    pub play_events: usize,
    /// Play events skipped because `ts` is not a representable instant
    pub unconvertible_ts: usize,
    /// Facts with a catalog match
    pub matched_plays: usize,
}

impl TransformStats {
    /// Facts without a catalog match
    pub fn unmatched_plays(&self) -> usize {
        self.play_events - self.matched_plays
    }
}
