use chrono::{Duration, NaiveDate};
use drill_core::model::{Word, WordId};
use drill_core::time::fixed_now;
use storage::repository::{NewWordRecord, PlayLogRepository, StorageError, WordRepository};
use storage::sqlite::{SqliteInitError, SqliteRepository};

async fn connect(name: &str) -> SqliteRepository {
    SqliteRepository::open(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("open")
}

fn record(primary: &str, secondary: &str, offset_secs: i64) -> NewWordRecord {
    NewWordRecord {
        text_primary: primary.into(),
        text_secondary: secondary.into(),
        included: true,
        created_at: fixed_now() + Duration::seconds(offset_secs),
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn sqlite_words_roundtrip_and_selection() {
    let repo = connect("memdb_words").await;

    let a = repo.insert_new_word(record("một", "하나", 0)).await.unwrap();
    let b = repo.insert_new_word(record("hai", "둘", 1)).await.unwrap();
    let c = repo.insert_new_word(record("ba", "셋", 2)).await.unwrap();

    let mut word = repo.get_word(b).await.unwrap().expect("word exists");
    assert_eq!(word.text_secondary(), "둘");
    assert_eq!(word.created_at(), fixed_now() + Duration::seconds(1));

    word.set_included(false);
    word.edit("hai ", "두").unwrap();
    repo.upsert_word(&word).await.unwrap();

    let included: Vec<WordId> = repo
        .list_included_words()
        .await
        .unwrap()
        .iter()
        .map(Word::id)
        .collect();
    assert_eq!(included, vec![a, c]);

    let all = repo.list_words().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].text_secondary(), "두");
    assert!(!all[1].included());

    repo.delete_word(a).await.unwrap();
    assert!(repo.get_word(a).await.unwrap().is_none());
    let err = repo.delete_word(a).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_does_not_reuse_deleted_word_ids() {
    let repo = connect("memdb_word_ids").await;

    repo.insert_new_word(record("một", "하나", 0)).await.unwrap();
    let last = repo.insert_new_word(record("hai", "둘", 1)).await.unwrap();
    repo.delete_word(last).await.unwrap();

    let next = repo.insert_new_word(record("ba", "셋", 2)).await.unwrap();
    assert_ne!(next, last);
    assert!(next.value() > last.value());
}

#[tokio::test]
async fn sqlite_play_log_increments_and_windows() {
    let repo = connect("memdb_play_log").await;

    assert_eq!(repo.record_cycle(day(2024, 1, 1)).await.unwrap(), 1);
    assert_eq!(repo.record_cycle(day(2024, 1, 1)).await.unwrap(), 2);
    assert_eq!(repo.record_cycle(day(2024, 1, 1)).await.unwrap(), 3);
    assert_eq!(repo.record_cycle(day(2024, 1, 5)).await.unwrap(), 1);

    assert_eq!(repo.count_for_day(day(2024, 1, 1)).await.unwrap(), 3);
    assert_eq!(repo.count_for_day(day(2024, 1, 2)).await.unwrap(), 0);

    let window = repo.last_7_days(day(2024, 1, 8)).await.unwrap();
    assert_eq!(window.len(), 7);
    assert_eq!(window[0].date, day(2024, 1, 2));
    assert_eq!(window[6].date, day(2024, 1, 8));
    let counts: Vec<u32> = window.iter().map(|e| e.count).collect();
    assert_eq!(counts, vec![0, 0, 0, 1, 0, 0, 0]);

    let inside = repo.last_7_days(day(2024, 1, 7)).await.unwrap();
    assert_eq!(inside[0].date, day(2024, 1, 1));
    assert_eq!(inside[0].count, 3);
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let id = repo.insert_new_word(record("nước", "물", 0)).await.unwrap();
    assert_eq!(id, WordId::new(1));
}

#[tokio::test]
async fn missing_database_file_is_an_open_error() {
    let err = SqliteRepository::open("sqlite:/nonexistent-drill-dir/words.db")
        .await
        .err()
        .expect("open should fail");
    assert!(matches!(err, SqliteInitError::Open(_)), "got {err:?}");
}
