use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::user_repo::{StoreError, UserStore};
use crate::models::{NewUser, User, UserPatch};

/// Map-backed store for tests and local runs
#[derive(Default)]
pub struct InMemoryUserStore {
    state: Mutex<(i64, BTreeMap<i64, User>)>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (i64, BTreeMap<i64, User>)> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut guard = self.lock();
        let (next_id, rows) = &mut *guard;
        if rows.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        *next_id += 1;
        let row = User {
            id: *next_id,
            name: user.name.clone(),
            email: user.email.clone(),
        };
        rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().1.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.lock().1.values().rev().cloned().collect())
    }

    async fn update(&self, id: i64, patch: &UserPatch) -> Result<Option<User>, StoreError> {
        let mut guard = self.lock();
        let rows = &mut guard.1;
        if let Some(email) = &patch.email {
            if rows.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        let Some(row) = rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(email) = &patch.email {
            row.email = email.clone();
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.lock().1.remove(&id).is_some())
    }

    async fn email_taken(&self, email: &str, except_id: Option<i64>) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .1
            .values()
            .any(|u| u.email == email && Some(u.id) != except_id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
