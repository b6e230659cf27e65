//! [`UserStore`] and its implementations.

mod memory;
mod pg;
mod user_store;

pub use memory::InMemoryUserStore;
pub use pg::PgUserStore;
pub use user_store::{StoreError, UserStore};
