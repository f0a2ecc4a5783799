use anyhow::Context;
use notifications_rs::{
    config::Config,
    db, event_bus, router, schema,
    services::{DispatchService, HttpRecipientValidator},
    repos::PgNotificationStore,
    shutdown::shutdown_signal,
    telemetry, AppState,
};
use platform_http_contracts::OriginPolicy;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("info");

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        user_service_url = %config.user_service_url,
        "Starting notification service"
    );

    let pool = db::init_pool(&config).context("invalid DATABASE_URL")?;
    schema::ensure_schema(&pool, &config.bootstrap_retry()).await?;

    let bus = event_bus::build_bus(&config.bus);
    let validator = HttpRecipientValidator::new(
        config.user_service_url.clone(),
        config.recipient_check_timeout,
    )
    .context("failed to build HTTP client")?;

    let dispatch = DispatchService::new(
        Arc::new(PgNotificationStore::new(pool.clone())),
        Arc::new(validator),
        bus.clone(),
    );
    let state = Arc::new(AppState::new(
        dispatch,
        OriginPolicy::from_csv(&config.trusted_origins),
    ));
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Notification service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pool.close().await;
    if let Err(e) = bus.close().await {
        tracing::warn!(error = %e, "Failed to close event bus");
    }
    tracing::info!("Notification service stopped");
    Ok(())
}
