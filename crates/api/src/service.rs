//! User record operations and the lifecycle events they emit.
//!
//! Events are published only after the store mutation has committed, and
//! only for create and delete. Update never publishes, even when it changes
//! the email. A failed publish is logged and swallowed: the mutation stands
//! and the caller still sees success.

use std::sync::Arc;

use userhub_core::envelope::Operation;
use userhub_core::error::CoreError;
use userhub_core::types::DbId;
use userhub_db::models::user::{CreateUser, UpdateUser, User};
use userhub_db::UserStore;
use userhub_events::EventPublisher;
use validator::Validate;

use crate::error::AppResult;

pub struct UserService {
    store: Arc<dyn UserStore>,
    publisher: EventPublisher,
}

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound { entity: "User", id }
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: DbId) -> AppResult<User> {
        Ok(self.store.find_by_id(id).await?.ok_or_else(|| not_found(id))?)
    }

    /// Validate and insert, then publish `CREATE`.
    pub async fn create(&self, input: &CreateUser) -> AppResult<User> {
        input.validate()?;
        let user = self.store.create(input).await?;
        tracing::info!(user_id = user.id, "User created");

        self.emit(Operation::Create, &user.email).await;
        Ok(user)
    }

    pub async fn update(&self, id: DbId, input: &UpdateUser) -> AppResult<User> {
        input.validate()?;
        let user = self.store.update(id, input).await?.ok_or_else(|| not_found(id))?;
        tracing::info!(user_id = user.id, "User updated");
        Ok(user)
    }

    /// Delete, then publish `DELETE` with the email the record had.
    pub async fn delete(&self, id: DbId) -> AppResult<()> {
        let user = self.store.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        if !self.store.delete(id).await? {
            return Err(not_found(id).into());
        }
        tracing::info!(user_id = id, "User deleted");

        self.emit(Operation::Delete, &user.email).await;
        Ok(())
    }

    async fn emit(&self, operation: Operation, email: &str) {
        if let Err(e) = self.publisher.publish(operation.clone(), email).await {
            tracing::error!(
                %operation,
                email,
                error = %e,
                "Failed to publish user event, notification will not be sent"
            );
        }
    }
}
