//! Dimension tables
//!
//! Precedence rules:
//! - `songs` and `artists`: the first record seen for a key wins.
//! - `users`: the event with the largest `ts` wins the whole row; on equal
//!   `ts` the earlier event is kept.
//! - `time`: one row per distinct instant of a play event.

use super::types::{ArtistDim, SongDim, TimeDim, UserDim};
use crate::schema::{RawLogRecord, RawSongRecord};
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The instant of a play event, if the event is a play with a usable `ts`
pub fn play_instant(event: &RawLogRecord) -> Option<DateTime<Utc>> {
    if event.is_play() {
        event.start_time()
    } else {
        None
    }
}

/// Accumulates dimension rows from record streams
#[derive(Debug, Default)]
pub struct DimensionBuilder {
    songs: BTreeMap<String, SongDim>,
    artists: BTreeMap<String, ArtistDim>,
    users: HashMap<String, (i64, UserDim)>,
    instants: BTreeSet<DateTime<Utc>>,
}

impl DimensionBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one catalog record
    pub fn add_song(&mut self, record: &RawSongRecord) {
        self.songs
            .entry(record.song_id.clone())
            .or_insert_with(|| SongDim {
                song_id: record.song_id.clone(),
                title: record.title.clone(),
                artist_id: record.artist_id.clone(),
                year: record.year,
                duration: record.duration,
            });

        self.artists
            .entry(record.artist_id.clone())
            .or_insert_with(|| ArtistDim {
                artist_id: record.artist_id.clone(),
                name: record.artist_name.clone(),
                location: record.artist_location.clone(),
                latitude: record.artist_latitude,
                longitude: record.artist_longitude,
            });
    }

    /// Feed one event record
    pub fn add_event(&mut self, event: &RawLogRecord) {
        if let Some(user_id) = &event.user_id {
            let row = || UserDim {
                user_id: user_id.clone(),
                first_name: event.first_name.clone(),
                last_name: event.last_name.clone(),
                gender: event.gender.clone(),
                level: event.level.clone(),
            };

            match self.users.entry(user_id.clone()) {
                Entry::Occupied(mut slot) => {
                    if event.ts > slot.get().0 {
                        slot.insert((event.ts, row()));
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert((event.ts, row()));
                }
            }
        }

        if let Some(instant) = play_instant(event) {
            self.instants.insert(instant);
        }
    }

    /// Songs so far, ordered by `song_id`
    pub fn songs(&self) -> impl Iterator<Item = &SongDim> {
        self.songs.values()
    }

    /// Artists so far, ordered by `artist_id`
    pub fn artists(&self) -> impl Iterator<Item = &ArtistDim> {
        self.artists.values()
    }

    /// Finish the catalog dimensions
    pub fn catalog(&self) -> (Vec<SongDim>, Vec<ArtistDim>) {
        (
            self.songs.values().cloned().collect(),
            self.artists.values().cloned().collect(),
        )
    }

    /// Finish the users dimension, ordered by `user_id`
    pub fn users(&self) -> Vec<UserDim> {
        let mut users: Vec<UserDim> = self.users.values().map(|(_, u)| u.clone()).collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        users
    }

    /// Finish the time dimension, ordered by `start_time`
    pub fn time(&self) -> Vec<TimeDim> {
        self.instants
            .iter()
            .copied()
            .map(TimeDim::from_instant)
            .collect()
    }
}
