//! Producer side of the user lifecycle channel.
//!
//! [`EventPublisher`] is owned by the user service. It encodes a
//! [`UserEvent`] and hands it to the injected channel client, returning as
//! soon as the client has buffered it. Broker acknowledgement is never
//! awaited, and there is no transaction spanning the record store and the
//! channel: a publish failure after a committed mutation loses that
//! notification.

use userhub_core::envelope::{Operation, UserEvent};

use crate::channel::{ChannelError, ChannelHandle};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Error type for publish failures.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The transport did not accept the envelope (after any retries).
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Only `CREATE` and `DELETE` are ever published.
    #[error("Refusing to publish unsupported operation {0:?}")]
    UnsupportedOperation(String),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Which record key to attach to published envelopes.
///
/// The key decides the partition, and order is only guaranteed within a
/// partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartitionKey {
    /// No key: the broker's default partitioning. Two events for the same
    /// email may be consumed out of order.
    #[default]
    None,
    /// Key by email, so all events for one address share a partition.
    Email,
}

/// Publishes user lifecycle events to one topic.
pub struct EventPublisher {
    channel: ChannelHandle,
    topic: String,
    partition_key: PartitionKey,
    retry: RetryPolicy,
}

impl EventPublisher {
    /// Create a publisher with the baseline behaviour: no key, no retries.
    pub fn new(channel: ChannelHandle, topic: impl Into<String>) -> Self {
        Self {
            channel,
            topic: topic.into(),
            partition_key: PartitionKey::None,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_partition_key(mut self, partition_key: PartitionKey) -> Self {
        self.partition_key = partition_key;
        self
    }

    /// Retry [`ChannelError::Unavailable`] according to `retry`.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Emit one envelope for `operation` on `email`.
    pub async fn publish(&self, operation: Operation, email: &str) -> Result<(), PublishError> {
        if !operation.is_recognized() {
            return Err(PublishError::UnsupportedOperation(
                operation.as_str().to_string(),
            ));
        }

        let event = UserEvent::new(operation, email);
        let payload = event.to_bytes()?;
        let key = match self.partition_key {
            PartitionKey::None => None,
            PartitionKey::Email => Some(email),
        };

        retry_with_backoff(
            &self.retry,
            "publish",
            |_| self.channel.send(&self.topic, key, &payload),
            ChannelError::is_retryable,
        )
        .await
        .map_err(|e| PublishError::Channel(e.last_error))?;

        tracing::debug!(
            topic = %self.topic,
            operation = %event.operation,
            email = %event.email,
            "User event published"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::channel::InMemoryBroker;
    use assert_matches::assert_matches;

    const TOPIC: &str = "user-events";

    #[tokio::test]
    async fn publish_writes_one_unkeyed_envelope() {
        let broker = InMemoryBroker::default();
        let publisher = EventPublisher::new(Arc::new(broker.clone()), TOPIC);

        publisher
            .publish(Operation::Create, "test@example.com")
            .await
            .unwrap();

        let records = broker.records(TOPIC).await;
        assert_eq!(records.len(), 1);
        assert!(records[0].key.is_none());
        assert_eq!(
            UserEvent::from_bytes(&records[0].payload).unwrap(),
            UserEvent::created("test@example.com")
        );
    }

    #[tokio::test]
    async fn email_key_is_attached_when_configured() {
        let broker = InMemoryBroker::default();
        let publisher = EventPublisher::new(Arc::new(broker.clone()), TOPIC)
            .with_partition_key(PartitionKey::Email);

        publisher.publish(Operation::Delete, "k@example.com").await.unwrap();

        let records = broker.records(TOPIC).await;
        assert_eq!(records[0].key.as_deref(), Some(b"k@example.com".as_slice()));
    }

    #[tokio::test]
    async fn unrecognized_operation_is_refused() {
        let broker = InMemoryBroker::default();
        let publisher = EventPublisher::new(Arc::new(broker.clone()), TOPIC);

        let err = publisher
            .publish(Operation::parse("UPDATE"), "x@example.com")
            .await
            .unwrap_err();

        assert_matches!(err, PublishError::UnsupportedOperation(ref op) if op == "UPDATE");
        assert_eq!(broker.len(TOPIC).await, 0);
    }

    #[tokio::test]
    async fn unavailable_channel_fails_without_retry_by_default() {
        let broker = InMemoryBroker::default();
        broker.set_available(false);
        let publisher = EventPublisher::new(Arc::new(broker.clone()), TOPIC);

        let err = publisher
            .publish(Operation::Create, "x@example.com")
            .await
            .unwrap_err();

        assert_matches!(err, PublishError::Channel(ChannelError::Unavailable(_)));
        assert_eq!(broker.len(TOPIC).await, 0);
    }

    #[tokio::test]
    async fn retry_policy_rides_out_a_short_outage() {
        let broker = InMemoryBroker::default();
        broker.set_available(false);
        let publisher = EventPublisher::new(Arc::new(broker.clone()), TOPIC).with_retry(
            RetryPolicy::exponential(20, Duration::from_millis(5), Duration::from_millis(20)),
        );

        let healer = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            healer.set_available(true);
        });

        publisher
            .publish(Operation::Create, "x@example.com")
            .await
            .unwrap();
        assert_eq!(broker.len(TOPIC).await, 1);
    }
}
