//! Userhub shared domain types.
//!
//! Everything both services must agree on without negotiation lives here:
//! the [`UserEvent`](envelope::UserEvent) wire schema, the well-known topic
//! and consumer group names, the fixed notification templates, and the
//! domain error type.

pub mod channels;
pub mod config;
pub mod envelope;
pub mod error;
pub mod templates;
pub mod types;
