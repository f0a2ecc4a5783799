//! Notification persistence

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{NewNotification, Notification, NotificationPatch};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("datastore unavailable: {0}")]
    Unavailable(String),
}

/// Storage for notification rows
///
/// Every method returns the committed state: `insert` and `update` hand back
/// the row as stored, including server-assigned `id` and `created_at`.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, input: &NewNotification) -> Result<Notification, StoreError>;

    async fn find(&self, id: i64) -> Result<Option<Notification>, StoreError>;

    /// Most recently created first.
    async fn list(&self) -> Result<Vec<Notification>, StoreError>;

    /// `None` when no row has this id.
    async fn update(
        &self,
        id: i64,
        patch: &NotificationPatch,
    ) -> Result<Option<Notification>, StoreError>;

    /// `false` when no row has this id.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Round-trip to the datastore.
    async fn ping(&self) -> Result<(), StoreError>;
}

const COLUMNS: &str = r#"id, subject, message, "recipientId", created_at"#;

/// Postgres-backed store
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, input: &NewNotification) -> Result<Notification, StoreError> {
        let row = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (subject, message, "recipientId")
            VALUES ($1, $2, $3)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&input.subject)
        .bind(&input.message)
        .bind(input.recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find(&self, id: i64) -> Result<Option<Notification>, StoreError> {
        let row = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list(&self) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {COLUMNS} FROM notifications ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn update(
        &self,
        id: i64,
        patch: &NotificationPatch,
    ) -> Result<Option<Notification>, StoreError> {
        let row = sqlx::query_as::<_, Notification>(&format!(
            r#"
            UPDATE notifications
            SET subject = COALESCE($1, subject),
                message = COALESCE($2, message)
            WHERE id = $3
            RETURNING {COLUMNS}
            "#
        ))
        .bind(patch.subject.as_deref())
        .bind(patch.message.as_deref())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
