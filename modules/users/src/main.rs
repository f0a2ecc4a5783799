use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use users_rs::{
    config::Config, db, repos::PgUserStore, router, shutdown::shutdown_signal, telemetry,
    AppState, NotificationClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("info");

    let config = Config::from_env().context("invalid configuration")?;
    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .context("failed to connect to database")?;

    let notifier = NotificationClient::new(
        &config.notification_service_url,
        config.welcome_timeout,
        config.notify_timeout,
        config.origin_name.clone(),
    );
    let state = Arc::new(AppState::new(Arc::new(PgUserStore::new(pool.clone())), notifier));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        notification_service_url = %config.notification_service_url,
        "User service listening on {}",
        addr
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pool.close().await;
    tracing::info!("User service stopped");
    Ok(())
}
