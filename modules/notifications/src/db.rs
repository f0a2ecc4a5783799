use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;

/// Create the shared connection pool without connecting.
///
/// Connections are opened on demand, so an unreachable database surfaces on the
/// first query (the schema bootstrap, which retries) instead of here. When all
/// `max_connections` are checked out, callers wait up to `acquire_timeout` for
/// one to be returned.
pub fn init_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    connect_lazy(
        &config.database_url,
        config.db_max_connections,
        config.db_acquire_timeout,
    )
}

pub fn connect_lazy(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_lazy(database_url)
}
