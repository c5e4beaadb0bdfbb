//! Integration tests for the bundled stores.

use chrono::{TimeZone, Utc};
use omok_protocol::{EndReason, MatchStatus, MoveEntry, Players, RoomId, Symbol, UserId};
use omok_store::{JsonlStore, MatchRecord, MatchStore, MemoryStore, StoreError};
use uuid::Uuid;

fn record(n: u128, winner: Option<(UserId, Symbol)>) -> MatchRecord {
    let t0 = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    MatchRecord {
        room_id: RoomId::from_uuid(Uuid::from_u128(n)),
        players: Players { x: UserId(1), o: UserId(2) },
        moves: vec![
            MoveEntry { x: 7, y: 7, by: UserId(1), t: t0 },
            MoveEntry { x: 8, y: 7, by: UserId(2), t: t0 },
        ],
        winner_user_id: winner.map(|w| w.0),
        winner_symbol: winner.map(|w| w.1),
        status: MatchStatus::Ended,
        end_reason: if winner.is_some() { EndReason::Resign } else { EndReason::Draw },
        started_at: t0,
        ended_at: t0 + chrono::Duration::seconds(42),
    }
}

fn temp_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("omok-store-{tag}-{}.jsonl", Uuid::new_v4()))
}

#[test]
fn test_record_json_shape() {
    let json = serde_json::to_value(record(1, Some((UserId(2), Symbol::O)))).unwrap();
    assert_eq!(json["players"]["x"], 1);
    assert_eq!(json["players"]["o"], 2);
    assert_eq!(json["moves"][0]["by"], 1);
    assert_eq!(json["winnerUserId"], 2);
    assert_eq!(json["winnerSymbol"], "O");
    assert_eq!(json["status"], "Ended");
    assert!(json["startedAt"].is_string());
    assert!(json["endedAt"].is_string());
}

#[test]
fn test_record_is_draw() {
    assert!(record(1, None).is_draw());
    assert!(!record(1, Some((UserId(1), Symbol::X))).is_draw());
}

#[tokio::test]
async fn test_memory_store_keeps_save_order() {
    let store = MemoryStore::new();
    assert!(store.is_empty().await);

    store.save(record(1, None)).await.unwrap();
    store.save(record(2, Some((UserId(1), Symbol::X)))).await.unwrap();

    let saved = store.records().await;
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0], record(1, None));
    assert_eq!(saved[1].winner_user_id, Some(UserId(1)));
}

#[tokio::test]
async fn test_jsonl_store_appends_and_loads() {
    let path = temp_path("append");
    let store = JsonlStore::new(&path);

    store.save(record(1, None)).await.unwrap();
    store.save(record(2, Some((UserId(2), Symbol::O)))).await.unwrap();

    let loaded = store.load_all().await.unwrap();
    assert_eq!(loaded, vec![record(1, None), record(2, Some((UserId(2), Symbol::O)))]);

    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(raw.lines().count(), 2);
    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn test_jsonl_store_missing_file_loads_empty() {
    let store = JsonlStore::new(temp_path("missing"));
    assert!(store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_jsonl_store_missing_directory_is_io_error() {
    let path = std::env::temp_dir()
        .join(format!("omok-no-such-dir-{}", Uuid::new_v4()))
        .join("records.jsonl");
    let store = JsonlStore::new(path);
    let err = store.save(record(1, None)).await.unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
}

#[tokio::test]
async fn test_jsonl_store_corrupt_line_is_serialization_error() {
    let path = temp_path("corrupt");
    tokio::fs::write(&path, "{not a record}\n").await.unwrap();
    let store = JsonlStore::new(&path);
    let err = store.load_all().await.unwrap_err();
    assert!(matches!(err, StoreError::Serialization(_)));
    let _ = tokio::fs::remove_file(&path).await;
}
