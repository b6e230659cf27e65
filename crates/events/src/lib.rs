//! Userhub event propagation.
//!
//! This crate carries user lifecycle events from the user service to the
//! notification service:
//!
//! - [`channel`]: broker abstraction (in-process log, optional Kafka).
//! - [`EventPublisher`]: encodes and sends [`UserEvent`]s after a committed
//!   store mutation.
//! - [`EventSubscriber`]: consumer-group loop with a pluggable
//!   [`DeliveryPolicy`] (retry, dead letter).
//! - [`NotificationDispatcher`]: shared classification for the broker path
//!   and the direct HTTP path.
//! - [`ActionResolver`] and [`delivery`]: operation → fixed mail, sent
//!   through a [`MailSender`].
//!
//! [`UserEvent`]: userhub_core::envelope::UserEvent

pub mod channel;
pub mod config;
pub mod dead_letter;
pub mod delivery;
pub mod dispatcher;
pub mod publisher;
pub mod resolver;
pub mod retry;
pub mod subscriber;

pub use channel::{open_channel, BrokerChannel, ChannelError, ChannelHandle, InMemoryBroker};
pub use config::BrokerConfig;
pub use dead_letter::{DeadLetter, DeadLetterSink, TopicDeadLetterSink};
pub use delivery::{EmailConfig, LogMailer, MailError, MailSender, RecordingMailer, SmtpMailer};
pub use dispatcher::{ClassifyPolicy, Dispatch, DispatchError, NotificationDispatcher};
pub use publisher::{EventPublisher, PartitionKey, PublishError};
pub use resolver::ActionResolver;
pub use retry::RetryPolicy;
pub use subscriber::{DeliveryPolicy, EventSubscriber, HandleOutcome};
