//! Extraction tests

use super::*;
use crate::schema::{RawLogRecord, RawSongRecord};
use bytes::Bytes;
use object_store::memory::InMemory;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn song_line(song_id: &str, title: &str) -> String {
    format!(
        r#"{{"song_id":"{song_id}","title":"{title}","artist_id":"AR1","artist_name":"Artist","duration":200.5,"year":2001,"num_songs":1}}"#
    )
}

async fn store_with(files: &[(&str, String)]) -> LakeStore {
    let store = LakeStore::from_store(Arc::new(InMemory::new()), "raw");
    for (key, body) in files {
        store.put(key, Bytes::from(body.clone())).await.unwrap();
    }
    store
}

async fn drain<T: SchemaRecord>(extractor: &RecordExtractor) -> Vec<Extracted<T>> {
    let mut items = Vec::new();
    let mut stream = extractor.extract::<T>().await.unwrap();
    while let Some(item) = stream.next().await {
        items.push(item.unwrap());
    }
    items
}

#[tokio::test]
async fn test_files_sorted_and_filtered() {
    let store = store_with(&[
        ("B/b.json", song_line("S2", "b")),
        ("A/a.json", song_line("S1", "a")),
        ("A/notes.txt", "ignore me".to_string()),
    ])
    .await;

    let extractor = RecordExtractor::new(store);
    assert_eq!(extractor.files().await.unwrap(), vec!["A/a.json", "B/b.json"]);

    let narrowed = extractor.with_pattern("B/*.json").unwrap();
    assert_eq!(narrowed.files().await.unwrap(), vec!["B/b.json"]);
}

#[tokio::test]
async fn test_records_in_key_then_line_order() {
    let store = store_with(&[
        (
            "2.json",
            format!("{}\n{}\n", song_line("S3", "c"), song_line("S4", "d")),
        ),
        ("1.json", song_line("S1", "a")),
    ])
    .await;

    let items = drain::<RawSongRecord>(&RecordExtractor::new(store)).await;
    let ids: Vec<_> = items
        .into_iter()
        .filter_map(Extracted::record)
        .map(|s| s.song_id)
        .collect();
    assert_eq!(ids, vec!["S1", "S3", "S4"]);
}

#[tokio::test]
async fn test_listing_is_taken_once() {
    let store = store_with(&[
        ("1.json", song_line("S1", "a")),
        ("2.json", song_line("S2", "b")),
    ])
    .await;
    let extractor = RecordExtractor::new(store.clone());

    let files = extractor.files().await.unwrap();
    store
        .put("3.json", Bytes::from(song_line("S3", "c")))
        .await
        .unwrap();

    let mut ids = Vec::new();
    let mut stream = extractor.extract_files::<RawSongRecord>(files);
    while let Some(item) = stream.next().await {
        if let Some(song) = item.unwrap().record() {
            ids.push(song.song_id);
        }
    }
    assert_eq!(ids, vec!["S1", "S2"]);
}

#[tokio::test]
async fn test_collect_stats_match_streamed_files() {
    let store = store_with(&[
        ("1.json", song_line("S1", "a")),
        ("2.json", format!("{}
not json
", song_line("S2", "b"))),
        ("notes.txt", "ignore me".to_string()),
    ])
    .await;

    let (songs, stats) = RecordExtractor::new(store)
        .collect::<RawSongRecord>()
        .await
        .unwrap();
    assert_eq!(songs.len(), 2);
    assert_eq!(
        stats,
        ExtractStats {
            files: 2,
            records: 2,
            rejected: 1,
        }
    );
}

#[tokio::test]
async fn test_bad_lines_are_rejected_not_fatal() {
    let body = [
        song_line("S1", "good"),
        "{not json".to_string(),
        String::new(),
        r#"{"title":"no id","artist_id":"AR1"}"#.to_string(),
        r#""just a string""#.to_string(),
        song_line("S2", "also good"),
    ]
    .join("\n");
    let store = store_with(&[("songs.json", body)]).await;

    let items = drain::<RawSongRecord>(&RecordExtractor::new(store)).await;
    assert_eq!(items.len(), 5);

    let rejections: Vec<_> = items.iter().filter_map(Extracted::rejection).collect();
    assert_eq!(rejections.len(), 3);
    assert_eq!(rejections[0].line, 2);
    assert!(matches!(rejections[0].reason, RejectReason::MalformedJson { .. }));
    assert_eq!(rejections[1].line, 4);
    assert_eq!(
        rejections[1].reason,
        RejectReason::MissingField {
            field: "song_id".to_string()
        }
    );
    assert_eq!(rejections[2].reason, RejectReason::NotAnObject);
    assert!(rejections[0].file.ends_with("raw/songs.json"));
}

#[tokio::test]
async fn test_unparseable_timestamp_rejected() {
    let body = concat!(
        r#"{"ts":"soon","page":"NextSong","userId":"1"}"#,
        "\n",
        r#"{"ts":1541990258796,"page":"NextSong","userId":"1"}"#
    );
    let store = store_with(&[("events.json", body.to_string())]).await;

    let (events, stats) = RecordExtractor::new(store)
        .collect::<RawLogRecord>()
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        stats,
        ExtractStats {
            files: 1,
            records: 1,
            rejected: 1
        }
    );
}

#[tokio::test]
async fn test_non_utf8_file_rejected_whole() {
    let store = LakeStore::from_store(Arc::new(InMemory::new()), "");
    store
        .put("bad.json", Bytes::from_static(&[0xff, 0xfe, b'{', b'}']))
        .await
        .unwrap();

    let items = drain::<RawSongRecord>(&RecordExtractor::new(store)).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].rejection().map(|r| r.line), Some(0));
}

#[tokio::test]
async fn test_empty_root_yields_nothing() {
    let store = store_with(&[]).await;
    let items = drain::<RawLogRecord>(&RecordExtractor::new(store)).await;
    assert!(items.is_empty());
}

#[test]
fn test_rejection_display() {
    let rejection = Rejection {
        file: "store://raw/x.json".to_string(),
        line: 7,
        reason: RejectReason::NotAnObject,
    };
    assert_eq!(
        rejection.to_string(),
        "store://raw/x.json:7: record is not a JSON object"
    );
}
