//! Integration tests for the PostgreSQL reading store.
//!
//! These need a running database; run with `DATABASE_URL` set and `--ignored`.

use augur_core::deck::Orientation;
use augur_core::store::{
    NewReadingRecord, READING_RECORD_TYPE, ReadingPayload, ReadingStore, StoredCard,
};
use augur_library::pg_store::PgReadingStore;
use chrono::{Duration, TimeZone, Utc};
use sqlx::PgPool;

fn record(user_id: &str, minutes: i64) -> NewReadingRecord {
    NewReadingRecord {
        user_id: user_id.to_owned(),
        record_type: READING_RECORD_TYPE.to_owned(),
        created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap() + Duration::minutes(minutes),
        payload: ReadingPayload {
            intention: format!("question {minutes}"),
            spread_id: "single".to_owned(),
            positions: vec!["Focus".to_owned()],
            cards: vec![StoredCard {
                card_id: "the-fool".to_owned(),
                position: "Focus".to_owned(),
                orientation: Orientation::Upright,
            }],
            interpretation: serde_json::json!({ "format": "legacy", "text": "A reading." }),
            source: "static".to_owned(),
        },
    }
}

async fn store(pool: PgPool) -> PgReadingStore {
    let store = PgReadingStore::new(pool);
    store.ensure_schema().await.unwrap();
    store
}

#[sqlx::test(migrations = false)]
#[ignore = "requires DATABASE_URL"]
async fn test_insert_then_select_newest_first(pool: PgPool) {
    let store = store(pool).await;
    store.insert(record("user-1", 0)).await.unwrap();
    store.insert(record("user-1", 5)).await.unwrap();
    store.insert(record("user-2", 10)).await.unwrap();

    let rows = store
        .select_by_user("user-1", READING_RECORD_TYPE, 10)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].payload.intention, "question 5");
    assert_eq!(rows[1].payload.intention, "question 0");
    assert_eq!(rows[0].payload.cards[0].card_id, "the-fool");
}

#[sqlx::test(migrations = false)]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_is_scoped_to_owner(pool: PgPool) {
    let store = store(pool).await;
    let saved = store.insert(record("user-1", 0)).await.unwrap();

    store.delete_by_id(&saved.id, "user-2").await.unwrap();
    let after_foreign = store
        .select_by_user("user-1", READING_RECORD_TYPE, 10)
        .await
        .unwrap();
    store.delete_by_id(&saved.id, "user-1").await.unwrap();
    let after_owner = store
        .select_by_user("user-1", READING_RECORD_TYPE, 10)
        .await
        .unwrap();

    assert_eq!(after_foreign.len(), 1);
    assert!(after_owner.is_empty());
}

#[sqlx::test(migrations = false)]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_with_malformed_id_is_rejected(pool: PgPool) {
    let store = store(pool).await;

    let result = store.delete_by_id("not-a-uuid", "user-1").await;

    assert!(result.is_err());
}

#[sqlx::test(migrations = false)]
#[ignore = "requires DATABASE_URL"]
async fn test_select_skips_rows_with_undecodable_payload(pool: PgPool) {
    // Arrange
    let store = store(pool.clone()).await;
    store.insert(record("user-1", 0)).await.unwrap();
    sqlx::query(
        "INSERT INTO readings (user_id, record_type, created_at, payload) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind("user-1")
    .bind(READING_RECORD_TYPE)
    .bind(Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap())
    .bind(serde_json::json!({ "intention": 42, "cards": "not a list" }))
    .execute(&pool)
    .await
    .unwrap();

    // Act
    let rows = store
        .select_by_user("user-1", READING_RECORD_TYPE, 10)
        .await
        .unwrap();

    // Assert
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].payload.intention, "question 0");
}
