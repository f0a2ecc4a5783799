//! Schema bootstrap against a real Postgres
//!
//! Requires `DATABASE_URL` pointing at a disposable database:
//! `cargo test -p notifications-rs --test schema_bootstrap_test -- --ignored`

mod common;

use notifications_rs::retry::RetryConfig;
use notifications_rs::schema::{ensure_schema, BootstrapError, SchemaStep, RECIPIENT_INDEX};
use serial_test::serial;
use std::time::Duration;

fn quick_retry() -> RetryConfig {
    RetryConfig::fixed(3, Duration::from_millis(50))
}

async fn column_names(pool: &sqlx::PgPool) -> Vec<String> {
    sqlx::query_scalar(
        r#"
        SELECT column_name::text FROM information_schema.columns
        WHERE table_schema = current_schema() AND table_name = 'notifications'
        ORDER BY column_name
        "#,
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_unreachable_datastore_fails_after_bounded_attempts() {
    let pool =
        notifications_rs::db::connect_lazy("postgres://u:p@127.0.0.1:1/none", 1, Duration::from_secs(1))
            .unwrap();

    let err = ensure_schema(&pool, &RetryConfig::fixed(2, Duration::from_millis(10)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::DatastoreUnreachable { attempts: 2, .. }
    ));
}

#[tokio::test]
async fn test_attempts_are_not_stretched_by_pool_acquire_timeout() {
    // a pool that would wait 30s for a connection before giving up
    let pool = notifications_rs::db::connect_lazy(
        "postgres://u:p@127.0.0.1:1/none",
        1,
        Duration::from_secs(30),
    )
    .unwrap();

    let started = std::time::Instant::now();
    let err = ensure_schema(&pool, &RetryConfig::fixed(3, Duration::from_millis(10)))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_secs(5),
        "3 attempts took {elapsed:?}"
    );
    // the real cause surfaces, not a pool timeout
    let BootstrapError::DatastoreUnreachable { attempts, source } = err;
    assert_eq!(attempts, 3);
    assert!(matches!(source, sqlx::Error::Io(_)), "unexpected error: {source}");
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_bootstrap_from_scratch_is_idempotent() {
    let pool = common::test_pool();
    sqlx::query("DROP TABLE IF EXISTS notifications")
        .execute(&pool)
        .await
        .unwrap();

    let first = ensure_schema(&pool, &quick_retry()).await.unwrap();
    let steps: Vec<SchemaStep> = first.applied.iter().map(|(s, _)| *s).collect();
    assert_eq!(steps, vec![SchemaStep::CreateTable, SchemaStep::RecipientIndex]);

    let second = ensure_schema(&pool, &quick_retry()).await.unwrap();
    assert!(second.is_noop(), "second run changed: {:?}", second.applied);

    assert_eq!(
        column_names(&pool).await,
        vec!["created_at", "id", "message", "recipientId", "subject"]
    );

    let index_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pg_indexes WHERE tablename = 'notifications' AND indexname = $1",
    )
    .bind(RECIPIENT_INDEX)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(index_count, 1);
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_legacy_table_is_reconciled_without_losing_rows() {
    let pool = common::test_pool();
    sqlx::query("DROP TABLE IF EXISTS notifications")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        r#"
        CREATE TABLE notifications (
            id BIGSERIAL PRIMARY KEY,
            subject VARCHAR(255) NOT NULL,
            message VARCHAR(255) NULL,
            "userId" INT NULL,
            status VARCHAR(32) NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(r#"INSERT INTO notifications (subject, message, "userId") VALUES ('old', NULL, 3)"#)
        .execute(&pool)
        .await
        .unwrap();

    let report = ensure_schema(&pool, &quick_retry()).await.unwrap();
    assert!(report
        .applied
        .iter()
        .any(|(step, _)| *step == SchemaStep::ReconcileColumns));

    assert_eq!(
        column_names(&pool).await,
        vec!["created_at", "id", "message", "recipientId", "subject"]
    );

    let (subject, message): (String, String) =
        sqlx::query_as("SELECT subject, message FROM notifications")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(subject, "old");
    assert_eq!(message, "");

    assert!(ensure_schema(&pool, &quick_retry()).await.unwrap().is_noop());
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_narrow_column_types_are_widened_for_reads() {
    use notifications_rs::models::NewNotification;
    use notifications_rs::repos::{NotificationStore, PgNotificationStore};

    let pool = common::test_pool();
    sqlx::query("DROP TABLE IF EXISTS notifications")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        r#"
        CREATE TABLE notifications (
            id SERIAL PRIMARY KEY,
            subject VARCHAR(255) NOT NULL,
            message TEXT NOT NULL,
            "recipientId" INT NULL,
            created_at TIMESTAMP NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(r#"INSERT INTO notifications (subject, message, "recipientId") VALUES ('old', 'm', 4)"#)
        .execute(&pool)
        .await
        .unwrap();

    let report = ensure_schema(&pool, &quick_retry()).await.unwrap();
    assert!(!report.is_noop());

    let store = PgNotificationStore::new(pool.clone());
    let rows = store.list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].recipient_id, Some(4));

    let created = store
        .insert(&NewNotification {
            subject: "new".to_string(),
            message: "m".to_string(),
            recipient_id: None,
        })
        .await
        .unwrap();
    assert!(created.id > rows[0].id);

    assert!(ensure_schema(&pool, &quick_retry()).await.unwrap().is_noop());
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_concurrent_bootstraps_do_not_conflict() {
    let pool = common::test_pool();
    sqlx::query("DROP TABLE IF EXISTS notifications")
        .execute(&pool)
        .await
        .unwrap();

    let retry = quick_retry();
    let (a, b) = tokio::join!(ensure_schema(&pool, &retry), ensure_schema(&pool, &retry));
    let (a, b) = (a.unwrap(), b.unwrap());

    // exactly one of them did the work
    assert!(a.is_noop() ^ b.is_noop());
}
