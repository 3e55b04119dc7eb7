//! Transform tests

use super::*;
use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use test_case::test_case;

fn song(song_id: &str, title: &str, artist_id: &str, artist: &str, duration: f64) -> RawSongRecord {
    RawSongRecord {
        song_id: song_id.to_string(),
        title: title.to_string(),
        artist_id: artist_id.to_string(),
        artist_name: Some(artist.to_string()),
        artist_location: None,
        artist_latitude: None,
        artist_longitude: None,
        duration: Some(duration),
        year: Some(2004),
        num_songs: Some(1),
    }
}

fn event(user_id: &str, ts: i64, page: &str, level: &str) -> RawLogRecord {
    RawLogRecord {
        ts,
        user_id: Some(user_id.to_string()),
        first_name: Some("Frances".to_string()),
        last_name: Some("Mcdonald".to_string()),
        gender: Some("F".to_string()),
        level: Some(level.to_string()),
        page: page.to_string(),
        song: None,
        artist: None,
        length: None,
        session_id: Some(139),
        location: Some("Atlanta-Sandy Springs-Roswell, GA".to_string()),
        user_agent: Some("Mozilla/5.0".to_string()),
    }
}

fn play(user_id: &str, ts: i64, title: &str, artist: &str, length: f64) -> RawLogRecord {
    RawLogRecord {
        song: Some(title.to_string()),
        artist: Some(artist.to_string()),
        length: Some(length),
        ..event(user_id, ts, "NextSong", "paid")
    }
}

fn instant(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

const TS: i64 = 1_541_990_258_796;
const NO_SONGS: &[RawSongRecord] = &[];

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_one_song_one_home_event() {
    let songs = vec![song(
        "SOUPIRU12A6D4FA1E1",
        "Der Kleine Dompfaff",
        "ARJIE2Y1187B994AB7",
        "Line Renaud",
        152.92036,
    )];
    let events = vec![event("39", TS, "Home", "free")];

    let (schema, stats) = build_star_schema(&songs, &events);

    assert_eq!(schema.songs.len(), 1);
    assert_eq!(schema.artists.len(), 1);
    assert_eq!(schema.users.len(), 1);
    assert_eq!(schema.users[0].user_id, "39");
    assert!(schema.songplays.is_empty());
    assert!(schema.time.is_empty());
    assert_eq!(stats.event_records, 1);
    assert_eq!(stats.play_events, 0);
}

#[test]
fn test_exact_match_fills_both_ids() {
    let songs = vec![song("S1", "Setanta matins", "AR1", "Elena", 269.58322)];
    let events = vec![play("26", TS, "Setanta matins", "Elena", 269.58322)];

    let (schema, stats) = build_star_schema(&songs, &events);

    assert_eq!(schema.songplays.len(), 1);
    let fact = &schema.songplays[0];
    assert_eq!(fact.songplay_id, 1);
    assert_eq!(fact.song_id.as_deref(), Some("S1"));
    assert_eq!(fact.artist_id.as_deref(), Some("AR1"));
    assert_eq!(fact.start_time, instant(TS));
    assert_eq!(stats.matched_plays, 1);
}

#[test]
fn test_no_match_still_emits_row() {
    let songs = vec![song("S1", "Setanta matins", "AR1", "Elena", 269.58322)];
    let events = vec![play("26", TS, "Unknown song", "Elena", 269.58322)];

    let (schema, stats) = build_star_schema(&songs, &events);

    assert_eq!(schema.songplays.len(), 1);
    assert_eq!(schema.songplays[0].song_id, None);
    assert_eq!(schema.songplays[0].artist_id, None);
    assert_eq!(stats.unmatched_plays(), 1);
    assert_eq!(schema.time.len(), 1);
}

#[test_case(269.58322, true ; "exact")]
#[test_case(269.5837, true ; "within tolerance")]
#[test_case(269.59, false ; "outside tolerance")]
fn test_duration_tolerance(length: f64, matches: bool) {
    let songs = vec![song("S1", "Setanta matins", "AR1", "Elena", 269.58322)];
    let events = vec![play("26", TS, "Setanta matins", "Elena", length)];

    let (schema, _) = build_star_schema(&songs, &events);
    assert_eq!(schema.songplays[0].song_id.is_some(), matches);
}

#[test]
fn test_artist_name_must_match() {
    let songs = vec![song("S1", "Setanta matins", "AR1", "Elena", 269.58322)];
    let events = vec![play("26", TS, "Setanta matins", "Somebody Else", 269.58322)];

    let (schema, _) = build_star_schema(&songs, &events);
    assert_eq!(schema.songplays[0].song_id, None);
}

#[test]
fn test_multiple_candidates_smallest_song_id_wins() {
    let songs = vec![
        song("S9", "Twin", "AR2", "Duo", 200.0),
        song("S3", "Twin", "AR1", "Duo", 200.0),
    ];
    let events = vec![play("26", TS, "Twin", "Duo", 200.0)];

    let (schema, _) = build_star_schema(&songs, &events);
    assert_eq!(schema.songplays[0].song_id.as_deref(), Some("S3"));
    assert_eq!(schema.songplays[0].artist_id.as_deref(), Some("AR1"));
}

// ============================================================================
// Dimension Precedence
// ============================================================================

#[test]
fn test_user_level_from_latest_event() {
    let events = vec![
        event("7", TS + 1_000, "NextSong", "paid"),
        event("7", TS, "Home", "free"),
        event("7", TS + 500, "Home", "free"),
    ];

    let (schema, _) = build_star_schema(NO_SONGS, &events);
    assert_eq!(schema.users.len(), 1);
    assert_eq!(schema.users[0].level.as_deref(), Some("paid"));
}

#[test]
fn test_user_tie_keeps_first_seen() {
    let mut second = event("7", TS, "Home", "paid");
    second.first_name = Some("Later".to_string());
    let events = vec![event("7", TS, "Home", "free"), second];

    let (schema, _) = build_star_schema(NO_SONGS, &events);
    assert_eq!(schema.users[0].level.as_deref(), Some("free"));
    assert_eq!(schema.users[0].first_name.as_deref(), Some("Frances"));
}

#[test]
fn test_events_without_user_do_not_create_users() {
    let mut anonymous = event("0", TS, "Home", "free");
    anonymous.user_id = None;

    let (schema, _) = build_star_schema(NO_SONGS, &[anonymous]);
    assert!(schema.users.is_empty());
}

#[test]
fn test_songs_and_artists_first_seen_wins() {
    let songs = vec![
        song("S1", "First title", "AR1", "First name", 100.0),
        song("S1", "Second title", "AR1", "Second name", 100.0),
        song("S2", "Other", "AR1", "Third name", 50.0),
    ];

    let (schema, _) = build_star_schema(&songs, Vec::<RawLogRecord>::new().iter());

    assert_eq!(schema.songs.len(), 2);
    assert_eq!(schema.songs[0].title, "First title");
    assert_eq!(schema.artists.len(), 1);
    assert_eq!(schema.artists[0].name.as_deref(), Some("First name"));
}

#[test]
fn test_dimension_keys_unique() {
    let songs: Vec<_> = (0..20)
        .map(|i| song(&format!("S{}", i % 7), "t", &format!("AR{}", i % 3), "a", 1.0))
        .collect();
    let events: Vec<_> = (0..30)
        .map(|i| event(&format!("{}", i % 4), TS + i * 1_000, "NextSong", "free"))
        .collect();

    let (schema, _) = build_star_schema(&songs, &events);

    let song_ids: HashSet<_> = schema.songs.iter().map(|s| &s.song_id).collect();
    let artist_ids: HashSet<_> = schema.artists.iter().map(|a| &a.artist_id).collect();
    let user_ids: HashSet<_> = schema.users.iter().map(|u| &u.user_id).collect();
    let instants: HashSet<_> = schema.time.iter().map(|t| t.start_time).collect();
    assert_eq!(song_ids.len(), schema.songs.len());
    assert_eq!(artist_ids.len(), schema.artists.len());
    assert_eq!(user_ids.len(), schema.users.len());
    assert_eq!(instants.len(), schema.time.len());
    assert_eq!(schema.songs.len(), 7);
    assert_eq!(schema.artists.len(), 3);
    assert_eq!(schema.users.len(), 4);
}

// ============================================================================
// Time
// ============================================================================

#[test]
fn test_time_breakdown() {
    // 2018-11-12 02:37:38 UTC, a Monday in ISO week 46
    let row = TimeDim::from_instant(instant(TS));
    assert_eq!(row.hour, 2);
    assert_eq!(row.day, 12);
    assert_eq!(row.week, 46);
    assert_eq!(row.month, 11);
    assert_eq!(row.year, 2018);
    assert_eq!(row.weekday, 2);
}

#[test]
fn test_weekday_sunday_is_one() {
    let sunday = Utc.with_ymd_and_hms(2018, 11, 4, 12, 0, 0).unwrap();
    let saturday = Utc.with_ymd_and_hms(2018, 11, 10, 12, 0, 0).unwrap();
    assert_eq!(TimeDim::from_instant(sunday).weekday, 1);
    assert_eq!(TimeDim::from_instant(saturday).weekday, 7);
}

#[test]
fn test_iso_week_at_year_boundary() {
    let new_year = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
    let row = TimeDim::from_instant(new_year);
    assert_eq!(row.week, 53);
    assert_eq!(row.year, 2021);
}

#[test]
fn test_every_fact_time_in_time_dimension() {
    let songs = vec![song("S1", "A", "AR1", "X", 10.0)];
    let events = vec![
        play("1", TS, "A", "X", 10.0),
        play("2", TS, "B", "Y", 5.0),
        play("1", TS + 60_000, "A", "X", 10.0),
        event("3", TS + 120_000, "Home", "free"),
    ];

    let (schema, _) = build_star_schema(&songs, &events);

    let times: HashSet<_> = schema.time.iter().map(|t| t.start_time).collect();
    assert_eq!(times.len(), 2);
    for fact in &schema.songplays {
        assert!(times.contains(&fact.start_time));
        if fact.song_id.is_some() {
            assert!(fact.artist_id.is_some());
        }
    }
}

#[test]
fn test_unconvertible_ts_excluded_from_facts_and_time() {
    let bad = play("1", i64::MAX, "A", "X", 10.0);
    let good = play("1", TS, "A", "X", 10.0);

    let (schema, stats) = build_star_schema(NO_SONGS, &[bad, good]);

    assert_eq!(schema.songplays.len(), 1);
    assert_eq!(schema.time.len(), 1);
    assert_eq!(schema.users.len(), 1);
    assert_eq!(stats.unconvertible_ts, 1);
}

// ============================================================================
// Fact Numbering
// ============================================================================

#[test]
fn test_songplay_ids_dense_and_ordered() {
    let mut late_session = play("2", TS, "A", "X", 1.0);
    late_session.session_id = Some(500);
    let events = vec![
        play("9", TS + 2_000, "A", "X", 1.0),
        late_session,
        play("1", TS, "A", "X", 1.0),
        play("5", TS + 1_000, "A", "X", 1.0),
    ];

    let (schema, _) = build_star_schema(NO_SONGS, &events);

    let ids: Vec<_> = schema.songplays.iter().map(|f| f.songplay_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    let users: Vec<_> = schema
        .songplays
        .iter()
        .map(|f| f.user_id.clone().unwrap())
        .collect();
    assert_eq!(users, vec!["1", "2", "5", "9"]);
}

#[test]
fn test_full_ties_keep_arrival_order() {
    let mut first = play("1", TS, "A", "X", 1.0);
    first.location = Some("first".to_string());
    let mut second = play("1", TS, "A", "X", 1.0);
    second.location = Some("second".to_string());

    let (schema, _) = build_star_schema(NO_SONGS, &[first, second]);

    assert_eq!(schema.songplays[0].location.as_deref(), Some("first"));
    assert_eq!(schema.songplays[1].songplay_id, 2);
}

#[test]
fn test_rebuild_is_deterministic() {
    let songs = vec![
        song("S2", "B", "AR2", "Y", 5.0),
        song("S1", "A", "AR1", "X", 10.0),
    ];
    let events = vec![
        play("3", TS + 5, "A", "X", 10.0),
        play("1", TS, "B", "Y", 5.0),
        event("2", TS + 9, "Home", "free"),
    ];

    let (first, _) = build_star_schema(&songs, &events);
    let (second, _) = build_star_schema(&songs, &events);
    assert_eq!(first, second);
}

#[test]
fn test_catalog_skips_unnamed_artists() {
    let mut unnamed = song("S1", "A", "AR1", "X", 10.0);
    unnamed.artist_name = None;
    let mut builder = DimensionBuilder::new();
    builder.add_song(&unnamed);

    let catalog = SongCatalog::new(builder.songs(), builder.artists());
    assert!(catalog.is_empty());
}
