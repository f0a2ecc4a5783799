pub mod health;
pub mod users;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use platform_http_contracts::correlation_id_middleware;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::notifier::NotificationClient;
use crate::repos::UserStore;

pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub notifier: NotificationClient,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, notifier: NotificationClient) -> Self {
        Self { store, notifier }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/notify", post(users::notify_user))
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
