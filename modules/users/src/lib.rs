pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notifier;
pub mod repos;
pub mod routes;
pub mod shutdown;
pub mod telemetry;
pub mod validation;

pub use notifier::NotificationClient;
pub use routes::{router, AppState};
