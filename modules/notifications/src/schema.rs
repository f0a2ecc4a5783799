//! Startup schema bootstrap for the notifications table
//!
//! Runs a fixed list of versioned steps, each idempotent, inside one
//! transaction guarded by a Postgres advisory lock so that replicas starting
//! together apply them one at a time. Table creation always runs first and
//! doubles as the connectivity probe: nothing else is attempted until it
//! succeeds. The whole run is retried with a fixed delay while the database
//! is coming up.
//!
//! Each attempt opens its own connection from the pool's connect options
//! rather than checking one out of the pool, so a dead database fails an
//! attempt within [`CONNECT_TIMEOUT`] instead of the pool's acquire timeout.

use sqlx::{ConnectOptions, Connection, PgConnection, PgPool};
use std::time::Duration;

use crate::retry::{retry_with_backoff, RetryConfig};

pub const TABLE: &str = "notifications";
pub const RECIPIENT_INDEX: &str = "idx_notifications_recipientId";

/// Columns that older deployments carried and the current model does not.
pub const LEGACY_COLUMNS: [&str; 2] = ["userId", "status"];

/// Upper bound on opening the connection for one bootstrap attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Arbitrary but stable key for `pg_advisory_xact_lock`.
const SCHEMA_LOCK_KEY: i64 = 0x6e6f_7469_6679;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id BIGSERIAL PRIMARY KEY,
    subject VARCHAR(255) NOT NULL,
    message TEXT NOT NULL,
    "recipientId" BIGINT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("datastore unreachable after {attempts} attempts: {source}")]
    DatastoreUnreachable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

/// One step of the bootstrap, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStep {
    CreateTable,
    ReconcileColumns,
    RecipientIndex,
}

impl SchemaStep {
    pub const ORDERED: [SchemaStep; 3] = [
        SchemaStep::CreateTable,
        SchemaStep::ReconcileColumns,
        SchemaStep::RecipientIndex,
    ];

    pub fn version(self) -> u32 {
        match self {
            SchemaStep::CreateTable => 1,
            SchemaStep::ReconcileColumns => 2,
            SchemaStep::RecipientIndex => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SchemaStep::CreateTable => "create_notifications_table",
            SchemaStep::ReconcileColumns => "reconcile_notification_columns",
            SchemaStep::RecipientIndex => "ensure_recipient_index",
        }
    }
}

/// A column as reported by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
}

impl ColumnInfo {
    pub fn new(column_name: &str, data_type: &str, nullable: bool) -> Self {
        Self {
            column_name: column_name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: if nullable { "YES" } else { "NO" }.to_string(),
        }
    }

    fn nullable(&self) -> bool {
        self.is_nullable.eq_ignore_ascii_case("YES")
    }
}

/// Statements actually executed by a bootstrap run; empty when the schema
/// was already current.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub applied: Vec<(SchemaStep, String)>,
}

impl SchemaReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Statements that bring an existing table in line with the current model.
///
/// Pure over the introspected columns so every drift case can be checked
/// without a database.
pub fn plan_column_alterations(columns: &[ColumnInfo]) -> Vec<String> {
    let find = |name: &str| columns.iter().find(|c| c.column_name == name);
    let mut statements = Vec::new();

    match find("subject") {
        None => statements.push(
            "ALTER TABLE notifications ADD COLUMN subject VARCHAR(255) NOT NULL DEFAULT ''"
                .to_string(),
        ),
        Some(col) if col.nullable() => {
            statements
                .push("UPDATE notifications SET subject = '' WHERE subject IS NULL".to_string());
            statements
                .push("ALTER TABLE notifications ALTER COLUMN subject SET NOT NULL".to_string());
        }
        Some(_) => {}
    }

    match find("message") {
        None => statements.push(
            "ALTER TABLE notifications ADD COLUMN message TEXT NOT NULL DEFAULT ''".to_string(),
        ),
        Some(col) => {
            if !col.data_type.eq_ignore_ascii_case("text") {
                statements.push(
                    "ALTER TABLE notifications ALTER COLUMN message TYPE TEXT".to_string(),
                );
            }
            if col.nullable() {
                statements
                    .push("UPDATE notifications SET message = '' WHERE message IS NULL".to_string());
                statements
                    .push("ALTER TABLE notifications ALTER COLUMN message SET NOT NULL".to_string());
            }
        }
    }

    if let Some(col) = find("id") {
        if !col.data_type.eq_ignore_ascii_case("bigint") {
            statements.push("ALTER TABLE notifications ALTER COLUMN id TYPE BIGINT".to_string());
        }
    }

    match find("recipientId") {
        None => statements
            .push(r#"ALTER TABLE notifications ADD COLUMN "recipientId" BIGINT NULL"#.to_string()),
        Some(col) if !col.data_type.eq_ignore_ascii_case("bigint") => statements.push(
            r#"ALTER TABLE notifications ALTER COLUMN "recipientId" TYPE BIGINT USING "recipientId"::bigint"#
                .to_string(),
        ),
        Some(_) => {}
    }

    match find("created_at") {
        None => statements.push(
            "ALTER TABLE notifications ADD COLUMN created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()"
                .to_string(),
        ),
        Some(col) => {
            if !col.data_type.eq_ignore_ascii_case("timestamp with time zone") {
                statements.push(
                    "ALTER TABLE notifications ALTER COLUMN created_at TYPE TIMESTAMPTZ".to_string(),
                );
            }
            if col.nullable() {
                statements.push(
                    "UPDATE notifications SET created_at = NOW() WHERE created_at IS NULL"
                        .to_string(),
                );
                statements.push(
                    "ALTER TABLE notifications ALTER COLUMN created_at SET NOT NULL".to_string(),
                );
            }
        }
    }

    for legacy in LEGACY_COLUMNS {
        if find(legacy).is_some() {
            statements.push(format!(r#"ALTER TABLE notifications DROP COLUMN "{legacy}""#));
        }
    }

    statements
}

/// Bring the schema up to date, retrying while the datastore is unreachable.
pub async fn ensure_schema(
    pool: &PgPool,
    retry: &RetryConfig,
) -> Result<SchemaReport, BootstrapError> {
    let report = retry_with_backoff(|| bootstrap_once(pool), retry, "schema_bootstrap")
        .await
        .map_err(|source| BootstrapError::DatastoreUnreachable {
            attempts: retry.max_attempts,
            source,
        })?;

    if report.is_noop() {
        tracing::info!("Notification schema up to date");
    } else {
        for (step, statement) in &report.applied {
            tracing::info!(
                version = step.version(),
                step = step.name(),
                statement = %statement,
                "Applied schema change"
            );
        }
    }

    Ok(report)
}

/// Open a dedicated connection with the pool's settings, bounded by
/// [`CONNECT_TIMEOUT`].
async fn connect_direct(pool: &PgPool) -> Result<PgConnection, sqlx::Error> {
    let options = pool.connect_options();
    match tokio::time::timeout(CONNECT_TIMEOUT, options.connect()).await {
        Ok(result) => result,
        Err(_) => Err(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("no connection within {}s", CONNECT_TIMEOUT.as_secs()),
        ))),
    }
}

/// A single bootstrap attempt on a fresh connection.
async fn bootstrap_once(pool: &PgPool) -> Result<SchemaReport, sqlx::Error> {
    let mut conn = connect_direct(pool).await?;
    let mut tx = conn.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    let mut report = SchemaReport::default();
    for step in SchemaStep::ORDERED {
        for statement in apply_step(&mut tx, step).await? {
            report.applied.push((step, statement));
        }
    }

    tx.commit().await?;
    Ok(report)
}

async fn apply_step(conn: &mut PgConnection, step: SchemaStep) -> Result<Vec<String>, sqlx::Error> {
    match step {
        SchemaStep::CreateTable => {
            let existed: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
                .bind(TABLE)
                .fetch_one(&mut *conn)
                .await?;
            sqlx::query(CREATE_TABLE).execute(&mut *conn).await?;
            Ok(if existed {
                Vec::new()
            } else {
                vec![CREATE_TABLE.trim().to_string()]
            })
        }
        SchemaStep::ReconcileColumns => {
            let columns = sqlx::query_as::<_, ColumnInfo>(
                r#"
                SELECT column_name::text AS column_name,
                       data_type::text AS data_type,
                       is_nullable::text AS is_nullable
                FROM information_schema.columns
                WHERE table_schema = current_schema() AND table_name = $1
                "#,
            )
            .bind(TABLE)
            .fetch_all(&mut *conn)
            .await?;

            let statements = plan_column_alterations(&columns);
            for statement in &statements {
                sqlx::query(statement).execute(&mut *conn).await?;
            }
            Ok(statements)
        }
        SchemaStep::RecipientIndex => {
            let exists: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM pg_indexes
                    WHERE schemaname = current_schema() AND tablename = $1 AND indexname = $2
                )
                "#,
            )
            .bind(TABLE)
            .bind(RECIPIENT_INDEX)
            .fetch_one(&mut *conn)
            .await?;

            if exists {
                return Ok(Vec::new());
            }
            let statement = format!(
                r#"CREATE INDEX IF NOT EXISTS "{RECIPIENT_INDEX}" ON notifications ("recipientId")"#
            );
            sqlx::query(&statement).execute(&mut *conn).await?;
            Ok(vec![statement])
        }
    }
}
