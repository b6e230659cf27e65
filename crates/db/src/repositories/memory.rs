//! In-memory [`UserStore`] for tests and database-less development.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use userhub_core::types::DbId;

use super::user_store::{StoreError, UserStore};
use crate::models::user::{CreateUser, UpdateUser, User};

#[derive(Default)]
struct Inner {
    users: BTreeMap<DbId, User>,
    last_id: DbId,
}

/// User store held in process memory.
///
/// Ids are assigned sequentially from 1 and email uniqueness is enforced the
/// same way the `uq_users_email` constraint does.
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.users.is_empty()
    }
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<DbId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        // Ids are monotonic, so reverse id order is newest first.
        Ok(inner.users.values().rev().cloned().collect())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create(&self, input: &CreateUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&input.email, None) {
            return Err(StoreError::DuplicateEmail(input.email.clone()));
        }

        inner.last_id += 1;
        let user = User {
            id: inner.last_id,
            name: input.name.clone(),
            email: input.email.clone(),
            age: input.age,
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: DbId, input: &UpdateUser) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(email) = &input.email {
            if inner.email_taken(email, Some(id)) {
                return Err(StoreError::DuplicateEmail(email.clone()));
            }
        }

        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            user.name = name.clone();
        }
        if let Some(email) = &input.email {
            user.email = email.clone();
        }
        if let Some(age) = input.age {
            user.age = Some(age);
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.users.remove(&id).is_some())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
