//! Kafka-backed channel (feature `kafka`).
//!
//! Producing uses [`FutureProducer::send_result`], which only enqueues the
//! record in librdkafka's local queue; the delivery report is not awaited.
//! Consuming uses a [`StreamConsumer`] with auto-commit disabled, so offsets
//! are only committed through [`ChannelConsumer::ack`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::{Offset, TopicPartitionList};

use super::{BrokerChannel, ChannelConsumer, ChannelError, Delivery};

/// Upper bound for flushing queued records on close.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// How long librdkafka keeps trying to deliver a queued record.
const MESSAGE_TIMEOUT_MS: &str = "30000";

/// Consumer session timeout before the group rebalances.
const SESSION_TIMEOUT_MS: &str = "6000";

impl From<KafkaError> for ChannelError {
    fn from(err: KafkaError) -> Self {
        ChannelError::Broker(err.to_string())
    }
}

/// Kafka client shared by the publisher and the subscribers of a process.
pub struct KafkaChannel {
    brokers: String,
    producer: FutureProducer,
    open: AtomicBool,
}

impl KafkaChannel {
    /// Create the producer. Connections are established lazily by librdkafka.
    pub fn connect(brokers: &str) -> Result<Self, ChannelError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", MESSAGE_TIMEOUT_MS)
            .create()?;

        Ok(Self {
            brokers: brokers.to_string(),
            producer,
            open: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl BrokerChannel for KafkaChannel {
    async fn send(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
    ) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }

        let mut record = FutureRecord::<[u8], [u8]>::to(topic).payload(payload);
        if let Some(key) = key {
            record = record.key(key.as_bytes());
        }

        // Dropping the delivery future does not cancel the send.
        match self.producer.send_result(record) {
            Ok(_delivery) => Ok(()),
            Err((err, _record)) => Err(ChannelError::Unavailable(err.to_string())),
        }
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
    ) -> Result<Box<dyn ChannelConsumer>, ChannelError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", group)
            .set("bootstrap.servers", &self.brokers)
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", SESSION_TIMEOUT_MS)
            .create()?;

        consumer.subscribe(&[topic])?;
        tracing::info!(topic, group, "Kafka consumer subscribed");

        Ok(Box::new(KafkaConsumer { inner: consumer }))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.open.store(false, Ordering::SeqCst);
        self.producer.flush(FLUSH_TIMEOUT)?;
        tracing::info!("Kafka producer flushed");
        Ok(())
    }
}

struct KafkaConsumer {
    inner: StreamConsumer,
}

#[async_trait]
impl ChannelConsumer for KafkaConsumer {
    async fn recv(&mut self) -> Result<Option<Delivery>, ChannelError> {
        let message = self.inner.recv().await?;
        Ok(Some(Delivery {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        }))
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), ChannelError> {
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(
            &delivery.topic,
            delivery.partition,
            Offset::Offset(delivery.offset + 1),
        )?;
        self.inner.commit(&offsets, CommitMode::Async)?;
        Ok(())
    }
}
