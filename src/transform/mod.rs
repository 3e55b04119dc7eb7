//! Star-schema derivation
//!
//! Raw catalog and event records go in, the five tables come out.
//! [`StarSchemaBuilder`] drives both builders in one pass over each stream;
//! all catalog records must be fed before the first event, because play
//! events are matched against the catalog as they arrive.

mod dimensions;
mod facts;
mod types;

#[cfg(test)]
mod tests;

pub use dimensions::{play_instant, DimensionBuilder};
pub use facts::{FactBuilder, SongCatalog, DURATION_TOLERANCE};
pub use types::{
    ArtistDim, SongDim, SongPlayFact, StarSchema, TimeDim, TransformStats, UserDim,
};

use crate::schema::{RawLogRecord, RawSongRecord};
use tracing::{debug, info, warn};

/// Streaming builder for all five tables
#[derive(Debug, Default)]
pub struct StarSchemaBuilder {
    dimensions: DimensionBuilder,
    facts: Option<FactBuilder>,
    stats: TransformStats,
}

impl StarSchemaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one catalog record
    pub fn add_song(&mut self, record: &RawSongRecord) {
        if self.facts.is_some() {
            warn!(
                song_id = %record.song_id,
                "Catalog record arrived after events; it will not be matched"
            );
        }
        self.stats.song_records += 1;
        self.dimensions.add_song(record);
    }

    /// Feed one event record
    pub fn add_event(&mut self, event: &RawLogRecord) {
        let dimensions = &self.dimensions;
        let facts = self.facts.get_or_insert_with(|| {
            let catalog = SongCatalog::new(dimensions.songs(), dimensions.artists());
            debug!(songs = catalog.len(), "Built song catalog index");
            FactBuilder::new(catalog)
        });

        self.stats.event_records += 1;
        facts.add_event(event);
        self.dimensions.add_event(event);
    }

    /// Finish every table
    pub fn finish(self) -> (StarSchema, TransformStats) {
        let mut stats = self.stats;
        let (songs, artists) = self.dimensions.catalog();
        let users = self.dimensions.users();
        let time = self.dimensions.time();

        let songplays = match self.facts {
            Some(facts) => {
                stats.matched_plays = facts.matched();
                stats.unconvertible_ts = facts.unconvertible();
                facts.finish()
            }
            None => Vec::new(),
        };
        stats.play_events = songplays.len();

        info!(
            songs = songs.len(),
            artists = artists.len(),
            users = users.len(),
            time = time.len(),
            songplays = songplays.len(),
            matched = stats.matched_plays,
            "Derived star schema"
        );

        (
            StarSchema {
                songs,
                artists,
                users,
                time,
                songplays,
            },
            stats,
        )
    }
}

/// Derive every table from in-memory records
pub fn build_star_schema<'a>(
    songs: impl IntoIterator<Item = &'a RawSongRecord>,
    events: impl IntoIterator<Item = &'a RawLogRecord>,
) -> (StarSchema, TransformStats) {
    let mut builder = StarSchemaBuilder::new();
    for song in songs {
        builder.add_song(song);
    }
    for event in events {
        builder.add_event(event);
    }
    builder.finish()
}
