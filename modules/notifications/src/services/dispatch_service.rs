//! The notification dispatch pipeline
//!
//! create: validate shape → check recipient (unless the caller is a trusted
//! origin) → persist → publish notifications.created. Persistence is the
//! commit point; the publish that follows is best-effort and its failure
//! never turns a successful create into an error.

use event_bus::{BusError, EventBus};
use platform_http_contracts::{BestEffort, CorrelationId};
use std::sync::Arc;

use crate::error::DispatchError;
use crate::event_bus::publish_notification_created;
use crate::models::{NewNotification, Notification, NotificationCreatedEvent, NotificationPatch};
use crate::repos::NotificationStore;
use crate::services::recipient_validator::{RecipientCheck, RecipientValidator};
use crate::validation::{validate_new, validate_patch};

/// A create request as seen by the pipeline
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub notification: NewNotification,
    /// Set at the HTTP boundary when the request comes from a trusted origin
    /// (the registry itself), which would otherwise be called back for a
    /// recipient it is in the middle of serving.
    pub skip_recipient_validation: bool,
    pub correlation_id: CorrelationId,
}

/// A committed create and what happened to its event
#[derive(Debug)]
pub struct Created {
    pub notification: Notification,
    pub event: BestEffort<BusError>,
}

#[derive(Clone)]
pub struct DispatchService {
    store: Arc<dyn NotificationStore>,
    validator: Arc<dyn RecipientValidator>,
    bus: Arc<dyn EventBus>,
}

impl DispatchService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        validator: Arc<dyn RecipientValidator>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            store,
            validator,
            bus,
        }
    }

    pub async fn create(&self, request: CreateNotification) -> Result<Created, DispatchError> {
        let CreateNotification {
            notification,
            skip_recipient_validation,
            correlation_id,
        } = request;

        validate_new(&notification)?;

        if let Some(recipient_id) = notification.recipient_id {
            if skip_recipient_validation {
                tracing::debug!(
                    correlation_id = %correlation_id,
                    recipient_id,
                    "Trusted origin, skipping recipient check"
                );
            } else {
                self.ensure_recipient(recipient_id, &correlation_id).await?;
            }
        }

        let stored = self.store.insert(&notification).await?;
        tracing::info!(
            correlation_id = %correlation_id,
            notification_id = stored.id,
            recipient_id = ?stored.recipient_id,
            "Notification stored"
        );

        let event = NotificationCreatedEvent {
            notification: stored.clone(),
            correlation_id: correlation_id.clone().into_inner(),
        };
        let outcome = publish_notification_created(self.bus.as_ref(), &event).await;
        if let Some(e) = outcome.dropped() {
            tracing::warn!(
                correlation_id = %correlation_id,
                notification_id = stored.id,
                error = %e,
                "notifications.created not published"
            );
        }

        Ok(Created {
            notification: stored,
            event: outcome,
        })
    }

    async fn ensure_recipient(
        &self,
        recipient_id: i64,
        correlation_id: &CorrelationId,
    ) -> Result<(), DispatchError> {
        match self.validator.check(recipient_id, correlation_id).await {
            RecipientCheck::Exists => Ok(()),
            RecipientCheck::NotFound => Err(DispatchError::RecipientNotFound { recipient_id }),
            RecipientCheck::Unavailable(reason) => Err(DispatchError::UpstreamUnavailable(reason)),
        }
    }

    pub async fn get(&self, id: i64) -> Result<Notification, DispatchError> {
        self.store.find(id).await?.ok_or(DispatchError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<Notification>, DispatchError> {
        Ok(self.store.list().await?)
    }

    pub async fn update(
        &self,
        id: i64,
        patch: NotificationPatch,
    ) -> Result<Notification, DispatchError> {
        validate_patch(&patch)?;
        self.store
            .update(id, &patch)
            .await?
            .ok_or(DispatchError::NotFound)
    }

    pub async fn delete(&self, id: i64) -> Result<(), DispatchError> {
        if self.store.delete(id).await? {
            Ok(())
        } else {
            Err(DispatchError::NotFound)
        }
    }

    /// Datastore round-trip for readiness probes.
    pub async fn ping(&self) -> Result<(), DispatchError> {
        Ok(self.store.ping().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::NOTIFICATION_CREATED_SUBJECT;
    use crate::repos::InMemoryNotificationStore;
    use async_trait::async_trait;
    use event_bus::InMemoryBus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedValidator {
        answer: RecipientCheck,
        calls: AtomicUsize,
    }

    impl FixedValidator {
        fn new(answer: RecipientCheck) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecipientValidator for FixedValidator {
        async fn check(&self, _: i64, _: &CorrelationId) -> RecipientCheck {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    struct Harness {
        service: DispatchService,
        store: Arc<InMemoryNotificationStore>,
        bus: InMemoryBus,
        validator: Arc<FixedValidator>,
    }

    fn harness(answer: RecipientCheck) -> Harness {
        let store = Arc::new(InMemoryNotificationStore::new());
        let bus = InMemoryBus::new();
        let validator = FixedValidator::new(answer);
        let service = DispatchService::new(store.clone(), validator.clone(), Arc::new(bus.clone()));
        Harness {
            service,
            store,
            bus,
            validator,
        }
    }

    fn request(recipient_id: Option<i64>, trusted: bool) -> CreateNotification {
        CreateNotification {
            notification: NewNotification {
                subject: "Hi".to_string(),
                message: "Hello".to_string(),
                recipient_id,
            },
            skip_recipient_validation: trusted,
            correlation_id: CorrelationId::new("abc-123"),
        }
    }

    #[tokio::test]
    async fn create_persists_then_publishes_with_correlation_id() {
        let h = harness(RecipientCheck::Exists);

        let created = h.service.create(request(Some(1), false)).await.unwrap();
        assert!(created.event.is_delivered());
        assert_eq!(h.validator.calls(), 1);
        assert_eq!(h.store.len(), 1);

        let published = h.bus.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].subject, NOTIFICATION_CREATED_SUBJECT);
        let event: NotificationCreatedEvent = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(event.notification, created.notification);
        assert_eq!(event.correlation_id, "abc-123");
    }

    #[tokio::test]
    async fn no_recipient_means_no_check() {
        let h = harness(RecipientCheck::NotFound);
        h.service.create(request(None, false)).await.unwrap();
        assert_eq!(h.validator.calls(), 0);
    }

    #[tokio::test]
    async fn trusted_origin_skips_the_check() {
        let h = harness(RecipientCheck::NotFound);
        let created = h.service.create(request(Some(999), true)).await.unwrap();
        assert_eq!(created.notification.recipient_id, Some(999));
        assert_eq!(h.validator.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_recipient_is_rejected_before_any_side_effect() {
        let h = harness(RecipientCheck::NotFound);
        let err = h.service.create(request(Some(999), false)).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::RecipientNotFound { recipient_id: 999 }
        ));
        assert!(h.store.is_empty());
        assert!(h.bus.published().is_empty());
    }

    #[tokio::test]
    async fn unreachable_registry_is_upstream_unavailable() {
        let h = harness(RecipientCheck::Unavailable("timed out".to_string()));
        let err = h.service.create(request(Some(1), false)).await.unwrap_err();
        assert!(matches!(err, DispatchError::UpstreamUnavailable(_)));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn broker_outage_does_not_fail_the_create() {
        let h = harness(RecipientCheck::Exists);
        h.bus.set_available(false);

        let created = h.service.create(request(Some(1), false)).await.unwrap();
        assert!(!created.event.is_delivered());
        assert_eq!(h.store.len(), 1);
        assert!(h.bus.published().is_empty());
    }

    #[tokio::test]
    async fn datastore_failure_publishes_nothing() {
        let h = harness(RecipientCheck::Exists);
        h.store.set_available(false);

        let err = h.service.create(request(None, false)).await.unwrap_err();
        assert!(matches!(err, DispatchError::Store(_)));
        assert!(h.bus.published().is_empty());
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_without_io() {
        let h = harness(RecipientCheck::Exists);
        let mut req = request(Some(1), false);
        req.notification.subject = "  ".to_string();

        let err = h.service.create(req).await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert_eq!(h.validator.calls(), 0);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let h = harness(RecipientCheck::Exists);
        let patch = NotificationPatch {
            subject: Some("x".to_string()),
            message: None,
        };
        assert!(matches!(
            h.service.update(42, patch).await,
            Err(DispatchError::NotFound)
        ));
        assert!(matches!(h.service.delete(42).await, Err(DispatchError::NotFound)));
        assert!(matches!(h.service.get(42).await, Err(DispatchError::NotFound)));
    }

    #[tokio::test]
    async fn empty_patch_leaves_the_row_unchanged() {
        let h = harness(RecipientCheck::Exists);
        let created = h.service.create(request(None, false)).await.unwrap();
        let row = h
            .service
            .update(created.notification.id, NotificationPatch::default())
            .await
            .unwrap();
        assert_eq!(row, created.notification);

        assert!(matches!(
            h.service.update(42, NotificationPatch::default()).await,
            Err(DispatchError::NotFound)
        ));
    }

    #[tokio::test]
    async fn blank_patch_field_is_a_validation_error() {
        let h = harness(RecipientCheck::Exists);
        let created = h.service.create(request(None, false)).await.unwrap();
        let patch = NotificationPatch {
            subject: Some("  ".to_string()),
            message: None,
        };
        let err = h
            .service
            .update(created.notification.id, patch)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }
}
