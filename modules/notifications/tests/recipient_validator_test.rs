mod common;

use common::{RegistryMode, StubRegistry};
use notifications_rs::services::{HttpRecipientValidator, RecipientCheck, RecipientValidator};
use platform_http_contracts::CorrelationId;
use std::time::Duration;

fn validator(base_url: &str) -> HttpRecipientValidator {
    HttpRecipientValidator::new(base_url, Duration::from_millis(300)).unwrap()
}

#[tokio::test]
async fn test_existing_and_missing_users() {
    let registry = StubRegistry::start(&[7], RegistryMode::Normal).await;
    let v = validator(&registry.base_url);
    let cid = CorrelationId::new("cid-1");

    assert_eq!(v.check(7, &cid).await, RecipientCheck::Exists);
    assert_eq!(v.check(8, &cid).await, RecipientCheck::NotFound);
    assert_eq!(
        registry.calls(),
        vec![(7, Some("cid-1".to_string())), (8, Some("cid-1".to_string()))]
    );
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() {
    let registry = StubRegistry::start(&[7], RegistryMode::Normal).await;
    let v = validator(&format!("{}/", registry.base_url));

    assert_eq!(
        v.check(7, &CorrelationId::new("c")).await,
        RecipientCheck::Exists
    );
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let registry = StubRegistry::start(&[7], RegistryMode::Failing).await;
    let v = validator(&registry.base_url);

    assert!(matches!(
        v.check(7, &CorrelationId::new("c")).await,
        RecipientCheck::Unavailable(_)
    ));
}

#[tokio::test]
async fn test_timeout_is_unavailable() {
    let registry = StubRegistry::start(&[7], RegistryMode::Hanging).await;
    let v = validator(&registry.base_url);

    let started = std::time::Instant::now();
    let result = v.check(7, &CorrelationId::new("c")).await;
    assert!(matches!(result, RecipientCheck::Unavailable(ref reason) if reason.contains("timed out")));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_unreachable_registry_is_unavailable() {
    let v = validator("http://127.0.0.1:1");
    assert!(matches!(
        v.check(7, &CorrelationId::new("c")).await,
        RecipientCheck::Unavailable(_)
    ));
}
