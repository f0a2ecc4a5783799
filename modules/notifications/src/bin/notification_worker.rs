use anyhow::Context;
use notifications_rs::{
    config::BusConfig, event_bus, run_notification_created_consumer, shutdown::shutdown_signal,
    telemetry, LoggingSink,
};

/// Consumes notifications.created and hands each event to the logging sink.
///
/// Exits non-zero if the broker cannot be reached at startup or the
/// subscription fails later on.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("info");

    let config = BusConfig::from_env().context("invalid configuration")?;
    let bus = event_bus::build_bus(&config);
    let sink = LoggingSink;

    tokio::select! {
        result = run_notification_created_consumer(bus.as_ref(), &sink) => {
            result.context("notification consumer stopped")?;
            tracing::warn!("Subscription ended");
        }
        _ = shutdown_signal() => {}
    }

    if let Err(e) = bus.close().await {
        tracing::warn!(error = %e, "Failed to close event bus");
    }
    tracing::info!("Notification worker stopped");
    Ok(())
}
