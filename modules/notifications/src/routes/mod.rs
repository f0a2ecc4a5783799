pub mod health;
pub mod notifications;

use axum::{middleware, routing::get, Router};
use platform_http_contracts::{correlation_id_middleware, OriginPolicy};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::DispatchService;

/// Shared handler state
pub struct AppState {
    pub dispatch: DispatchService,
    pub origins: OriginPolicy,
}

impl AppState {
    pub fn new(dispatch: DispatchService, origins: OriginPolicy) -> Self {
        Self { dispatch, origins }
    }
}

/// Full HTTP surface of the notification service.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route(
            "/notifications/{id}",
            get(notifications::get_notification)
                .put(notifications::update_notification)
                .delete(notifications::delete_notification),
        )
        .with_state(state)
        .layer(middleware::from_fn(correlation_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}
