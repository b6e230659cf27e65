//! Consumer side of the user lifecycle channel.
//!
//! [`EventSubscriber`] joins the notification consumer group, feeds every
//! delivery through the [`NotificationDispatcher`] with the lenient policy,
//! and decides per delivery whether to acknowledge it.
//!
//! What happens when sending the mail fails is decided by the
//! [`DeliveryPolicy`]:
//!
//! - baseline (default): log the failure and acknowledge. The notification
//!   is lost.
//! - retry: retryable failures are retried with backoff first.
//! - dead letter: after the last attempt the delivery is written to a
//!   [`DeadLetterSink`] and then acknowledged. If that write fails the
//!   delivery stays unacknowledged: the subscriber drops its consumer and
//!   subscribes again, so reading resumes from the committed offset and the
//!   delivery comes back before anything after it in its partition.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::channel::{ChannelConsumer, ChannelError, ChannelHandle, Delivery};
use crate::dead_letter::{DeadLetter, DeadLetterSink};
use crate::dispatcher::{ClassifyPolicy, Dispatch, DispatchError, NotificationDispatcher};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Pause after a failed receive before polling the channel again.
const RECV_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Default pause before re-subscribing after a delivery was left
/// unacknowledged.
pub const DEFAULT_REDELIVERY_BACKOFF: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// DeliveryPolicy
// ---------------------------------------------------------------------------

/// Failure handling for dispatched deliveries.
#[derive(Clone, Default)]
pub struct DeliveryPolicy {
    pub retry: RetryPolicy,
    pub dead_letter: Option<Arc<dyn DeadLetterSink>>,
}

impl DeliveryPolicy {
    /// No retry, no dead letter.
    pub fn baseline() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_dead_letter(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letter = Some(sink);
        self
    }
}

// ---------------------------------------------------------------------------
// HandleOutcome
// ---------------------------------------------------------------------------

/// What became of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The notification mail was sent.
    Delivered,
    /// Unrecognized or malformed; nothing was sent.
    Discarded,
    /// Sending failed and no dead-letter sink is configured.
    Failed,
    /// Sending failed and the delivery was written to the dead-letter sink.
    DeadLettered,
    /// Sending failed and so did the dead-letter write.
    Unacknowledged,
}

impl HandleOutcome {
    /// Whether the delivery should be committed for the consumer group.
    pub fn acknowledges(self) -> bool {
        !matches!(self, Self::Unacknowledged)
    }
}

// ---------------------------------------------------------------------------
// EventSubscriber
// ---------------------------------------------------------------------------

/// Long-running consumer of user lifecycle events.
pub struct EventSubscriber {
    channel: ChannelHandle,
    topic: String,
    group: String,
    dispatcher: NotificationDispatcher,
    policy: DeliveryPolicy,
    redelivery_backoff: Duration,
}

/// How one consumer session ended.
enum Session {
    /// Cancelled or the channel closed.
    Finished,
    /// A delivery was left unacknowledged; read again from the committed
    /// offsets.
    Rewind,
}

impl EventSubscriber {
    pub fn new(
        channel: ChannelHandle,
        topic: impl Into<String>,
        group: impl Into<String>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            channel,
            topic: topic.into(),
            group: group.into(),
            dispatcher,
            policy: DeliveryPolicy::baseline(),
            redelivery_backoff: DEFAULT_REDELIVERY_BACKOFF,
        }
    }

    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_redelivery_backoff(mut self, backoff: Duration) -> Self {
        self.redelivery_backoff = backoff;
        self
    }

    /// Run the receive loop.
    ///
    /// Exits when `cancel` fires or the channel is closed. Cancellation is
    /// only observed while waiting for a delivery: a delivery that has been
    /// received is always handled and acknowledged (or not) first.
    ///
    /// An unacknowledged delivery ends the current consumer session. Later
    /// records of its partition are never read past it, so a following ack
    /// cannot commit over it.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ChannelError> {
        let mut consumer = self.channel.subscribe(&self.topic, &self.group).await?;
        tracing::info!(topic = %self.topic, group = %self.group, "Subscriber started");

        loop {
            match self.consume(consumer.as_mut(), &cancel).await {
                Session::Finished => return Ok(()),
                Session::Rewind => drop(consumer),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Subscriber cancelled");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.redelivery_backoff) => {}
            }

            consumer = match self.channel.subscribe(&self.topic, &self.group).await {
                Ok(consumer) => consumer,
                Err(ChannelError::Closed) => {
                    tracing::info!("Channel closed, subscriber shutting down");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            tracing::info!(
                topic = %self.topic,
                group = %self.group,
                "Subscriber rejoined, resuming from committed offsets"
            );
        }
    }

    async fn consume(
        &self,
        consumer: &mut dyn ChannelConsumer,
        cancel: &CancellationToken,
    ) -> Session {
        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Subscriber cancelled");
                    return Session::Finished;
                }
                received = consumer.recv() => received,
            };

            let delivery = match received {
                Ok(Some(delivery)) => delivery,
                Ok(None) => {
                    tracing::info!("Channel closed, subscriber shutting down");
                    return Session::Finished;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive from channel");
                    tokio::select! {
                        _ = cancel.cancelled() => return Session::Finished,
                        _ = tokio::time::sleep(RECV_ERROR_BACKOFF) => continue,
                    }
                }
            };

            let outcome = self.handle(&delivery).await;
            if !outcome.acknowledges() {
                return Session::Rewind;
            }
            if let Err(e) = consumer.ack(&delivery).await {
                tracing::error!(
                    partition = delivery.partition,
                    offset = delivery.offset,
                    error = %e,
                    "Failed to acknowledge delivery"
                );
            }
        }
    }

    /// Dispatch one delivery and apply the delivery policy to a failure.
    pub async fn handle(&self, delivery: &Delivery) -> HandleOutcome {
        let result = retry_with_backoff(
            &self.policy.retry,
            "dispatch",
            |_| {
                self.dispatcher
                    .dispatch_payload(&delivery.payload, ClassifyPolicy::Lenient)
            },
            DispatchError::is_retryable,
        )
        .await;

        let failure = match result {
            Ok(Dispatch::Sent(_)) => return HandleOutcome::Delivered,
            Ok(Dispatch::Discarded) => return HandleOutcome::Discarded,
            Err(failure) => failure,
        };

        let Some(sink) = &self.policy.dead_letter else {
            tracing::error!(
                partition = delivery.partition,
                offset = delivery.offset,
                attempts = failure.attempts,
                error = %failure.last_error,
                "Notification failed, delivery dropped"
            );
            return HandleOutcome::Failed;
        };

        let letter = DeadLetter::new(delivery, failure.attempts, failure.last_error.to_string());
        match sink.store(&letter).await {
            Ok(()) => HandleOutcome::DeadLettered,
            Err(e) => {
                tracing::error!(
                    partition = delivery.partition,
                    offset = delivery.offset,
                    error = %e,
                    "Dead-letter write failed, leaving delivery unacknowledged"
                );
                HandleOutcome::Unacknowledged
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
