//! Broker channel abstraction.
//!
//! A channel is a durable, partitioned, ordered log. Producers append
//! payloads to a topic; each consumer group reads every record at least once
//! and commits its progress with [`ChannelConsumer::ack`]. Order is only
//! guaranteed within a partition.
//!
//! The channel client is constructed explicitly at service start
//! ([`open_channel`]), shared as a [`ChannelHandle`], and closed on shutdown.
//!
//! Implementations:
//!
//! - [`InMemoryBroker`]: in-process log for tests and single-process
//!   development.
//! - `KafkaChannel` (feature `kafka`): librdkafka producer/consumer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BrokerConfig;

mod memory;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use memory::{InMemoryBroker, DEFAULT_PARTITIONS};

/// Shared handle to an open channel client.
pub type ChannelHandle = Arc<dyn BrokerChannel>;

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// One record as delivered to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The transport cannot accept records right now (broker down, network
    /// partition, local buffer full).
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    /// The channel client has been closed.
    #[error("Channel closed")]
    Closed,

    /// Any other broker-reported failure.
    #[error("Broker error: {0}")]
    Broker(String),
}

impl ChannelError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Producer side of a channel, plus the factory for consumers.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Hand a record to the transport.
    ///
    /// Returns once the record is accepted by the local buffering layer. It
    /// does not wait for the broker to acknowledge it.
    async fn send(&self, topic: &str, key: Option<&str>, payload: &[u8])
        -> Result<(), ChannelError>;

    /// Join `group` as a consumer of `topic`. Reading resumes after the
    /// group's last acknowledged offsets.
    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
    ) -> Result<Box<dyn ChannelConsumer>, ChannelError>;

    fn is_open(&self) -> bool;

    /// Flush buffered records and release the client.
    async fn close(&self) -> Result<(), ChannelError>;
}

/// A consumer-group member reading one topic.
#[async_trait]
pub trait ChannelConsumer: Send {
    /// Wait for the next delivery. Returns `None` once the channel is closed.
    async fn recv(&mut self) -> Result<Option<Delivery>, ChannelError>;

    /// Commit `delivery` (and everything before it in its partition) for
    /// this consumer group. Unacknowledged deliveries are redelivered to the
    /// next consumer of the group.
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), ChannelError>;
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Open the channel client described by `config`.
///
/// With `KAFKA_BROKERS` set this connects to Kafka (requires the `kafka`
/// feature). Without it an in-process broker is used, which only connects
/// producers and consumers living in the same process.
pub fn open_channel(config: &BrokerConfig) -> Result<ChannelHandle, ChannelError> {
    match &config.brokers {
        #[cfg(feature = "kafka")]
        Some(brokers) => {
            let channel = kafka::KafkaChannel::connect(brokers)?;
            tracing::info!(brokers = %brokers, "Kafka channel opened");
            Ok(Arc::new(channel))
        }
        #[cfg(not(feature = "kafka"))]
        Some(_) => Err(ChannelError::Broker(
            "KAFKA_BROKERS is set but userhub-events was built without the `kafka` feature"
                .to_string(),
        )),
        None => {
            tracing::warn!(
                partitions = config.partitions,
                "KAFKA_BROKERS not set, using the in-process channel"
            );
            Ok(Arc::new(InMemoryBroker::new(config.partitions)))
        }
    }
}
