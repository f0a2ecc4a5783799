//! In-memory store for tests and local development without Postgres

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::notification_repo::{NotificationStore, StoreError};
use crate::models::{NewNotification, Notification, NotificationPatch};

#[derive(Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<i64, Notification>,
}

/// Store backed by a map, with ids assigned from 1 upwards.
///
/// Can be flipped to unavailable to simulate a datastore outage.
pub struct InMemoryNotificationStore {
    state: Mutex<State>,
    available: AtomicBool,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        }
    }
}

impl Default for InMemoryNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, input: &NewNotification) -> Result<Notification, StoreError> {
        self.ensure_available()?;
        let mut state = self.lock();
        state.next_id += 1;
        let row = Notification {
            id: state.next_id,
            subject: input.subject.clone(),
            message: input.message.clone(),
            recipient_id: input.recipient_id,
            created_at: Utc::now(),
        };
        state.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find(&self, id: i64) -> Result<Option<Notification>, StoreError> {
        self.ensure_available()?;
        Ok(self.lock().rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Notification>, StoreError> {
        self.ensure_available()?;
        Ok(self.lock().rows.values().rev().cloned().collect())
    }

    async fn update(
        &self,
        id: i64,
        patch: &NotificationPatch,
    ) -> Result<Option<Notification>, StoreError> {
        self.ensure_available()?;
        let mut state = self.lock();
        let Some(row) = state.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(subject) = &patch.subject {
            row.subject = subject.clone();
        }
        if let Some(message) = &patch.message {
            row.message = message.clone();
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.ensure_available()?;
        Ok(self.lock().rows.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new(subject: &str) -> NewNotification {
        NewNotification {
            subject: subject.to_string(),
            message: "body".to_string(),
            recipient_id: None,
        }
    }

    #[tokio::test]
    async fn ids_increase_and_list_is_newest_first() {
        let store = InMemoryNotificationStore::new();
        let a = store.insert(&new("a")).await.unwrap();
        let b = store.insert(&new("b")).await.unwrap();
        assert!(b.id > a.id);

        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn update_only_touches_provided_fields() {
        let store = InMemoryNotificationStore::new();
        let row = store.insert(&new("a")).await.unwrap();

        let patch = NotificationPatch {
            subject: Some("changed".to_string()),
            message: None,
        };
        let updated = store.update(row.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.subject, "changed");
        assert_eq!(updated.message, "body");
        assert_eq!(updated.created_at, row.created_at);

        assert!(store.update(999, &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_missing_rows() {
        let store = InMemoryNotificationStore::new();
        let row = store.insert(&new("a")).await.unwrap();
        assert!(store.delete(row.id).await.unwrap());
        assert!(!store.delete(row.id).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryNotificationStore::new();
        store.set_available(false);
        assert!(matches!(
            store.insert(&new("a")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.ping().await.is_err());
    }
}
