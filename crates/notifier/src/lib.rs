//! Userhub notification service library.
//!
//! The notifier has two entry points that share one
//! [`NotificationDispatcher`](userhub_events::NotificationDispatcher):
//!
//! - a subscriber on the `user-events` topic ([`setup::build_subscriber`]);
//! - `POST /notifications/send` for callers that want a synchronous answer.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod setup;
pub mod state;
