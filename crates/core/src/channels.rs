//! Well-known broker channel names.
//!
//! The producer and the consumer are deployed independently, so these values
//! are the contract between them. Both sides read them from here (or from an
//! explicit override in configuration).

/// Topic carrying [`UserEvent`](crate::envelope::UserEvent) envelopes.
pub const USER_EVENTS_TOPIC: &str = "user-events";

/// Consumer group of the notification service.
pub const NOTIFICATION_GROUP: &str = "notification-group";

/// Default topic for deliveries that exhausted their retries.
pub const DEFAULT_DEAD_LETTER_TOPIC: &str = "user-events.dead-letter";
