pub mod config;
pub mod consumer;
pub mod db;
pub mod error;
pub mod event_bus;
pub mod models;
pub mod repos;
pub mod retry;
pub mod routes;
pub mod schema;
pub mod services;
pub mod shutdown;
pub mod telemetry;
pub mod validation;

pub use consumer::{run_notification_created_consumer, LoggingSink, NotificationSink};
pub use routes::{router, AppState};
pub use services::dispatch_service::{CreateNotification, Created, DispatchService};
