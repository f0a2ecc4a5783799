//! Shared fixtures for user service integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use platform_http_contracts::{CORRELATION_ID_HEADER, ORIGIN_HEADER};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use users_rs::repos::InMemoryUserStore;
use users_rs::{router, AppState, NotificationClient};

/// A request received by the stub notification service
#[derive(Debug, Clone)]
pub struct Received {
    pub body: Value,
    pub correlation_id: Option<String>,
    pub origin: Option<String>,
}

/// Stub `POST /notifications` answering with a fixed status
pub struct StubNotifications {
    pub base_url: String,
    received: Arc<Mutex<Vec<Received>>>,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    delay: Duration,
    received: Arc<Mutex<Vec<Received>>>,
}

impl StubNotifications {
    pub async fn start(status: StatusCode) -> Self {
        Self::start_with_delay(status, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: StatusCode, delay: Duration) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/notifications", post(stub_create))
            .with_state(StubState {
                status,
                delay,
                received: received.clone(),
            });
        let addr = serve(app).await;
        Self {
            base_url: format!("http://{addr}"),
            received,
        }
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// Poll until `count` requests have arrived (bounded to ~2s).
    pub async fn wait_for(&self, count: usize) -> Vec<Received> {
        for _ in 0..200 {
            let seen = self.received();
            if seen.len() >= count {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.received()
    }
}

async fn stub_create(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.received.lock().unwrap().push(Received {
        body: body.clone(),
        correlation_id: header(CORRELATION_ID_HEADER),
        origin: header(ORIGIN_HEADER),
    });
    tokio::time::sleep(state.delay).await;

    let mut answer = body;
    answer["id"] = json!(1);
    if !state.status.is_success() {
        answer = json!({"code": state.status.as_u16(), "error": "recipient_not_found"});
    }
    (state.status, Json(answer))
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn client(base_url: &str) -> NotificationClient {
    NotificationClient::new(
        base_url,
        Duration::from_millis(300),
        Duration::from_millis(300),
        "user-service",
    )
}

pub fn test_router(notifications_url: &str) -> (Router, Arc<InMemoryUserStore>) {
    let store = Arc::new(InMemoryUserStore::new());
    let state = Arc::new(AppState::new(store.clone(), client(notifications_url)));
    (router(state), store)
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
