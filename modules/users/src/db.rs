use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Connect to Postgres and bring the `users` table up to date.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./db/migrations").run(&pool).await?;
    Ok(pool)
}
