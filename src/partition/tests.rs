//! Partition layout tests

use super::*;
use crate::transform::{SongDim, SongPlayFact, TimeDim, UserDim};
use crate::types::Table;
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn song(song_id: &str, artist_id: &str, year: Option<i64>) -> SongDim {
    SongDim {
        song_id: song_id.to_string(),
        title: "title".to_string(),
        artist_id: artist_id.to_string(),
        year,
        duration: Some(1.0),
    }
}

fn fact(ms: i64) -> SongPlayFact {
    SongPlayFact {
        songplay_id: 1,
        start_time: DateTime::<Utc>::from_timestamp_millis(ms).unwrap(),
        user_id: Some("1".to_string()),
        level: None,
        song_id: None,
        artist_id: None,
        session_id: None,
        location: None,
        user_agent: None,
    }
}

// ============================================================================
// Layouts
// ============================================================================

#[test]
fn test_table_layouts() {
    let names = |table| {
        PartitionSpec::for_table(table)
            .columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
    };
    assert_eq!(names(Table::Songs), vec!["year", "artist_id"]);
    assert_eq!(names(Table::Time), vec!["year", "month"]);
    assert_eq!(names(Table::Songplays), vec!["year", "month"]);
    assert!(PartitionSpec::for_table(Table::Users).is_unpartitioned());
    assert!(PartitionSpec::for_table(Table::Artists).is_unpartitioned());
    assert!(PartitionSpec::for_table(Table::Songs).is_partition_column("artist_id"));
    assert!(!PartitionSpec::for_table(Table::Songs).is_partition_column("title"));
}

#[test]
fn test_song_partition_path() {
    let key = song("S1", "ARJIE2Y1187B994AB7", Some(2004)).partition_key();
    assert_eq!(key.path(), "year=2004/artist_id=ARJIE2Y1187B994AB7");
}

#[test]
fn test_null_year_uses_default_partition() {
    let key = song("S1", "AR1", None).partition_key();
    assert_eq!(key.path(), "year=__HIVE_DEFAULT_PARTITION__/artist_id=AR1");
}

#[test]
fn test_fact_partition_from_start_time() {
    // 2018-11-12T02:37:38Z
    let key = fact(1_541_990_258_796).partition_key();
    assert_eq!(key.path(), "year=2018/month=11");
}

#[test]
fn test_time_and_fact_partitions_agree() {
    let fact = fact(1_541_990_258_796);
    let time = TimeDim::from_instant(fact.start_time);
    assert_eq!(time.partition_key(), fact.partition_key());
}

#[test]
fn test_unpartitioned_row_has_root_key() {
    let user = UserDim {
        user_id: "39".to_string(),
        first_name: None,
        last_name: None,
        gender: None,
        level: None,
    };
    let key = user.partition_key();
    assert!(key.is_root());
    assert_eq!(key.path(), "");
    assert_eq!(key.to_string(), "<root>");
}

// ============================================================================
// Escaping
// ============================================================================

#[test_case("AR1", "AR1" ; "plain")]
#[test_case("AC/DC", "AC%2FDC" ; "slash")]
#[test_case("a=b", "a%3Db" ; "equals")]
#[test_case("100%", "100%25" ; "percent")]
#[test_case("..", "%2E%2E" ; "dot dot")]
#[test_case("Beyoncé", "Beyoncé" ; "non ascii kept")]
fn test_escape_value(raw: &str, escaped: &str) {
    assert_eq!(escape_value(raw), escaped);
    assert_eq!(unescape_value(escaped).unwrap(), raw);
}

#[test]
fn test_unescape_rejects_truncated_escape() {
    assert!(unescape_value("abc%2").is_err());
}

#[test]
fn test_parse_path_roundtrip() {
    let spec = PartitionSpec::for_table(Table::Songs);
    let key = PartitionKey::root()
        .with("year", 1999_i64)
        .with("artist_id", "AC/DC");

    let parsed = spec.parse_path(&key.path()).unwrap();
    assert_eq!(parsed, key);
    assert_eq!(parsed.get("year"), Some(&PartitionValue::Integer(1999)));
}

#[test]
fn test_parse_path_default_partition() {
    let spec = PartitionSpec::for_table(Table::Time);
    let parsed = spec
        .parse_path("year=__HIVE_DEFAULT_PARTITION__/month=3")
        .unwrap();
    assert_eq!(parsed.get("year"), Some(&PartitionValue::Null));
    assert_eq!(parsed.get("month"), Some(&PartitionValue::Integer(3)));
}

#[test_case("year=2018" ; "too few segments")]
#[test_case("month=11/year=2018" ; "wrong column order")]
#[test_case("year=twenty/month=11" ; "non integer")]
fn test_parse_path_rejects(path: &str) {
    let spec = PartitionSpec::for_table(Table::Songplays);
    assert!(spec.parse_path(path).is_err());
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_route_groups_and_keeps_order() {
    let rows = vec![
        song("S3", "AR2", Some(2000)),
        song("S1", "AR1", Some(2000)),
        song("S2", "AR2", Some(2000)),
        song("S4", "AR1", Some(1990)),
    ];

    let routed = route(&rows);
    let paths: Vec<_> = routed.keys().map(PartitionKey::path).collect();
    assert_eq!(
        paths,
        vec![
            "year=1990/artist_id=AR1",
            "year=2000/artist_id=AR1",
            "year=2000/artist_id=AR2",
        ]
    );

    let ar2: Vec<_> = routed
        .values()
        .last()
        .unwrap()
        .iter()
        .map(|s| s.song_id.as_str())
        .collect();
    assert_eq!(ar2, vec!["S3", "S2"]);
}

#[test]
fn test_route_empty() {
    let routed = route::<SongDim>(&[]);
    assert!(routed.is_empty());
}
