//! User record persistence for the user service.
//!
//! The record store is a collaborator of the event pipeline: the user service
//! publishes a lifecycle event only after one of these writes has committed.
//! [`UserStore`] is implemented for Postgres ([`PgUserStore`]) and in memory
//! ([`InMemoryUserStore`]).

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub use repositories::{InMemoryUserStore, PgUserStore, StoreError, UserStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
