//! Round trip against a live Postgres with pgvector.
//!
//! Set `TEST_DATABASE_URL` to a disposable database to run these; the
//! `conversations` table is truncated before each test.

use memory_assistant::Error;
use memory_assistant::persistence::ConversationStore;
use memory_assistant::persistence::providers::postgres::PostgresStore;
use serial_test::serial;

const DIM: usize = 3;

async fn fresh_store() -> Option<PostgresStore> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };

    // The table may not exist yet on a brand new database
    let pool = sqlx::PgPool::connect(&url).await.expect("pool");
    let _ = sqlx::query("TRUNCATE conversations RESTART IDENTITY")
        .execute(&pool)
        .await;
    pool.close().await;

    let store = PostgresStore::connect(&url, DIM, 2).await.expect("connect");
    Some(store)
}

#[tokio::test]
#[serial]
async fn test_store_search_and_count() {
    let Some(store) = fresh_store().await else {
        return;
    };

    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.search(&[0.0, 0.0, 0.0], 5).await.unwrap().is_empty());

    store.store("far", "3", &[0.9, 0.0, 0.0]).await.unwrap();
    store.store("near", "1", &[0.1, 0.0, 0.0]).await.unwrap();
    store.store("middle", "2", &[0.5, 0.0, 0.0]).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);

    let matches = store.search(&[0.0, 0.0, 0.0], 2).await.unwrap();
    let prompts: Vec<&str> = matches.iter().map(|m| m.prompt.as_str()).collect();
    assert_eq!(prompts, vec!["near", "middle"]);
    assert_eq!(matches[0].response, "1");
    assert!((matches[0].distance - 0.1).abs() < 1e-4);
}

#[tokio::test]
#[serial]
async fn test_ties_keep_insertion_order() {
    let Some(store) = fresh_store().await else {
        return;
    };

    store.store("first", "a", &[1.0, 0.0, 0.0]).await.unwrap();
    store.store("second", "b", &[0.0, 1.0, 0.0]).await.unwrap();

    let matches = store.search(&[0.0, 0.0, 0.0], 5).await.unwrap();
    assert_eq!(matches[0].prompt, "first");
    assert_eq!(matches[1].prompt, "second");
}

#[tokio::test]
#[serial]
async fn test_dimension_mismatch_rejected() {
    let Some(store) = fresh_store().await else {
        return;
    };

    let err = store.store("p", "r", &[1.0, 2.0]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
    assert!(store.search(&[1.0], 1).await.is_err());
    assert_eq!(store.count().await.unwrap(), 0);
}
