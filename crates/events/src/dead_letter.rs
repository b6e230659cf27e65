//! Dead-letter records for deliveries that could not be handled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelError, ChannelHandle, Delivery};

/// A delivery the subscriber gave up on, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// The original message value, decoded as UTF-8 (lossy).
    pub payload: String,
    /// Dispatch attempts spent before giving up.
    pub attempts: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(delivery: &Delivery, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            topic: delivery.topic.clone(),
            partition: delivery.partition,
            offset: delivery.offset,
            payload: String::from_utf8_lossy(&delivery.payload).into_owned(),
            attempts,
            error: error.into(),
            failed_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeadLetterError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("Failed to encode dead letter: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Destination for dead letters.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn store(&self, letter: &DeadLetter) -> Result<(), DeadLetterError>;
}

/// Publishes dead letters as JSON to a topic on the broker channel.
pub struct TopicDeadLetterSink {
    channel: ChannelHandle,
    topic: String,
}

impl TopicDeadLetterSink {
    pub fn new(channel: ChannelHandle, topic: impl Into<String>) -> Self {
        Self {
            channel,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl DeadLetterSink for TopicDeadLetterSink {
    async fn store(&self, letter: &DeadLetter) -> Result<(), DeadLetterError> {
        let payload = serde_json::to_vec(letter)?;
        self.channel.send(&self.topic, None, &payload).await?;

        tracing::warn!(
            topic = %self.topic,
            source_topic = %letter.topic,
            partition = letter.partition,
            offset = letter.offset,
            error = %letter.error,
            "Delivery dead-lettered"
        );
        Ok(())
    }
}
