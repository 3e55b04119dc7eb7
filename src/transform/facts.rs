//! Fact table
//!
//! Each play event becomes one [`SongPlayFact`]. The catalog match needs the
//! same title, the same artist name and a duration within
//! [`DURATION_TOLERANCE`]; when several songs qualify the smallest `song_id`
//! wins. An unmatched play is still emitted, with both ids null.

use super::dimensions::play_instant;
use super::types::{ArtistDim, SongDim, SongPlayFact};
use crate::schema::RawLogRecord;
use std::collections::HashMap;

/// Largest duration difference, in seconds, that still counts as a match
pub const DURATION_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone)]
struct Candidate {
    song_id: String,
    artist_id: String,
    duration: f64,
}

/// Lookup index over the catalog dimensions
#[derive(Debug, Clone, Default)]
pub struct SongCatalog {
    /// (title, artist name) -> candidates ordered by song_id
    index: HashMap<(String, String), Vec<Candidate>>,
}

impl SongCatalog {
    /// Index songs by title and artist name
    ///
    /// Songs whose artist has no name, or that carry no duration, can never
    /// match and are left out.
    pub fn new<'a>(
        songs: impl IntoIterator<Item = &'a SongDim>,
        artists: impl IntoIterator<Item = &'a ArtistDim>,
    ) -> Self {
        let names: HashMap<&str, &str> = artists
            .into_iter()
            .filter_map(|a| a.name.as_deref().map(|name| (a.artist_id.as_str(), name)))
            .collect();

        let mut index: HashMap<(String, String), Vec<Candidate>> = HashMap::new();
        for song in songs {
            let (Some(name), Some(duration)) =
                (names.get(song.artist_id.as_str()), song.duration)
            else {
                continue;
            };
            index
                .entry((song.title.clone(), (*name).to_string()))
                .or_default()
                .push(Candidate {
                    song_id: song.song_id.clone(),
                    artist_id: song.artist_id.clone(),
                    duration,
                });
        }

        for candidates in index.values_mut() {
            candidates.sort_by(|a, b| a.song_id.cmp(&b.song_id));
        }

        Self { index }
    }

    /// Number of indexed songs
    pub fn len(&self) -> usize {
        self.index.values().map(Vec::len).sum()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Find `(song_id, artist_id)` for a played song
    pub fn lookup(&self, title: &str, artist: &str, length: f64) -> Option<(&str, &str)> {
        self.index
            .get(&(title.to_string(), artist.to_string()))?
            .iter()
            .find(|c| (c.duration - length).abs() <= DURATION_TOLERANCE)
            .map(|c| (c.song_id.as_str(), c.artist_id.as_str()))
    }
}

/// Collects play events and numbers them once all are in
#[derive(Debug, Default)]
pub struct FactBuilder {
    catalog: SongCatalog,
    pending: Vec<SongPlayFact>,
    matched: usize,
    unconvertible: usize,
}

impl FactBuilder {
    /// Create a builder matching against `catalog`
    pub fn new(catalog: SongCatalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    /// Feed one event; returns whether it produced a fact
    pub fn add_event(&mut self, event: &RawLogRecord) -> bool {
        if !event.is_play() {
            return false;
        }
        let Some(start_time) = play_instant(event) else {
            self.unconvertible += 1;
            return false;
        };

        let matched = match (&event.song, &event.artist, event.length) {
            (Some(title), Some(artist), Some(length)) => {
                self.catalog.lookup(title, artist, length)
            }
            _ => None,
        };
        if matched.is_some() {
            self.matched += 1;
        }

        self.pending.push(SongPlayFact {
            songplay_id: 0,
            start_time,
            user_id: event.user_id.clone(),
            level: event.level.clone(),
            song_id: matched.map(|(song_id, _)| song_id.to_string()),
            artist_id: matched.map(|(_, artist_id)| artist_id.to_string()),
            session_id: event.session_id,
            location: event.location.clone(),
            user_agent: event.user_agent.clone(),
        });
        true
    }

    /// Facts collected so far
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no fact has been collected
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Facts with a catalog match
    pub fn matched(&self) -> usize {
        self.matched
    }

    /// Play events dropped for an unusable `ts`
    pub fn unconvertible(&self) -> usize {
        self.unconvertible
    }

    /// Sort and assign dense `songplay_id`s starting at 1
    ///
    /// Order is (start_time, session_id, user_id), then arrival order; the
    /// stable sort keeps arrival order for full ties.
    pub fn finish(self) -> Vec<SongPlayFact> {
        let mut facts = self.pending;
        facts.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.session_id.cmp(&b.session_id))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        for (id, fact) in (1_i64..).zip(facts.iter_mut()) {
            fact.songplay_id = id;
        }
        facts
    }
}
