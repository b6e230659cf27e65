//! In-process partitioned log.
//!
//! [`InMemoryBroker`] models the delivery semantics of a Kafka-style broker
//! closely enough to test against:
//!
//! - each topic has a fixed number of partitions;
//! - keyed records always land in the same partition, unkeyed records are
//!   spread round-robin;
//! - each consumer group has committed offsets per partition, and a new
//!   consumer of the group resumes from them (so unacknowledged records are
//!   redelivered);
//! - a consumer drains the partition it is reading before moving on to the
//!   next, so records from different partitions can be observed in a
//!   different order than they were produced.
//!
//! It also lets tests take the broker "down" with
//! [`set_available`](InMemoryBroker::set_available).
//!
//! Only one consumer per group should be active at a time; there is no
//! partition assignment between group members.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{BrokerChannel, ChannelConsumer, ChannelError, Delivery};

/// Partition count used by [`InMemoryBroker::default`].
pub const DEFAULT_PARTITIONS: usize = 3;

#[derive(Debug, Clone)]
struct Record {
    key: Option<Vec<u8>>,
    payload: Vec<u8>,
}

#[derive(Default)]
struct LogState {
    /// topic → partitions → records (offset = index).
    topics: HashMap<String, Vec<Vec<Record>>>,
    /// (topic, group) → next offset to read, per partition.
    committed: HashMap<(String, String), Vec<i64>>,
}

struct Shared {
    partitions: usize,
    state: Mutex<LogState>,
    notify: Notify,
    available: AtomicBool,
    open: AtomicBool,
    next_partition: AtomicUsize,
}

impl Shared {
    fn partition_for(&self, key: Option<&str>) -> usize {
        match key {
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % self.partitions as u64) as usize
            }
            None => self.next_partition.fetch_add(1, Ordering::Relaxed) % self.partitions,
        }
    }
}

// ---------------------------------------------------------------------------
// InMemoryBroker
// ---------------------------------------------------------------------------

/// Thread-safe in-process broker. Cloning shares the same log.
#[derive(Clone)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    /// Create a broker whose topics have `partitions` partitions (at least 1).
    pub fn new(partitions: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                partitions: partitions.max(1),
                state: Mutex::new(LogState::default()),
                notify: Notify::new(),
                available: AtomicBool::new(true),
                open: AtomicBool::new(true),
                next_partition: AtomicUsize::new(0),
            }),
        }
    }

    pub fn partitions(&self) -> usize {
        self.shared.partitions
    }

    /// Simulate an outage: while unavailable every `send` fails with
    /// [`ChannelError::Unavailable`]. Consumers are unaffected.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// All records of `topic`, ordered by partition then offset.
    pub async fn records(&self, topic: &str) -> Vec<Delivery> {
        let state = self.shared.state.lock().await;
        let Some(partitions) = state.topics.get(topic) else {
            return Vec::new();
        };

        partitions
            .iter()
            .enumerate()
            .flat_map(|(partition, records)| {
                records.iter().enumerate().map(move |(offset, r)| Delivery {
                    topic: topic.to_string(),
                    partition: partition as i32,
                    offset: offset as i64,
                    key: r.key.clone(),
                    payload: r.payload.clone(),
                })
            })
            .collect()
    }

    /// Number of records ever appended to `topic`.
    pub async fn len(&self, topic: &str) -> usize {
        let state = self.shared.state.lock().await;
        state
            .topics
            .get(topic)
            .map(|p| p.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Committed next-offsets of `group` on `topic`, one per partition.
    pub async fn committed_offsets(&self, topic: &str, group: &str) -> Vec<i64> {
        let state = self.shared.state.lock().await;
        state
            .committed
            .get(&(topic.to_string(), group.to_string()))
            .cloned()
            .unwrap_or_else(|| vec![0; self.shared.partitions])
    }

    /// Whether `group` has acknowledged every record of `topic`.
    pub async fn fully_acknowledged(&self, topic: &str, group: &str) -> bool {
        let committed = self.committed_offsets(topic, group).await;
        let state = self.shared.state.lock().await;
        match state.topics.get(topic) {
            None => true,
            Some(partitions) => partitions
                .iter()
                .zip(committed)
                .all(|(records, next)| next >= records.len() as i64),
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITIONS)
    }
}

#[async_trait]
impl BrokerChannel for InMemoryBroker {
    async fn send(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
    ) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }
        if !self.shared.available.load(Ordering::SeqCst) {
            return Err(ChannelError::Unavailable(
                "in-memory broker is marked unavailable".to_string(),
            ));
        }

        let partition = self.shared.partition_for(key);
        {
            let mut state = self.shared.state.lock().await;
            let partitions = state
                .topics
                .entry(topic.to_string())
                .or_insert_with(|| vec![Vec::new(); self.shared.partitions]);
            partitions[partition].push(Record {
                key: key.map(|k| k.as_bytes().to_vec()),
                payload: payload.to_vec(),
            });
        }

        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
    ) -> Result<Box<dyn ChannelConsumer>, ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }

        let positions = self.committed_offsets(topic, group).await;
        Ok(Box::new(InMemoryConsumer {
            shared: Arc::clone(&self.shared),
            topic: topic.to_string(),
            group: group.to_string(),
            positions,
            current: 0,
        }))
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.shared.open.store(false, Ordering::SeqCst);
        self.shared.notify.notify_waiters();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InMemoryConsumer
// ---------------------------------------------------------------------------

struct InMemoryConsumer {
    shared: Arc<Shared>,
    topic: String,
    group: String,
    /// Next offset to read, per partition.
    positions: Vec<i64>,
    /// Partition currently being drained.
    current: usize,
}

impl InMemoryConsumer {
    /// Take the next record, staying on the current partition until it is
    /// drained.
    fn take_next(&mut self, state: &LogState) -> Option<Delivery> {
        let partitions = state.topics.get(&self.topic)?;
        let count = partitions.len();

        for step in 0..count {
            let partition = (self.current + step) % count;
            let position = self.positions[partition];
            if let Some(record) = partitions[partition].get(position as usize) {
                self.current = partition;
                self.positions[partition] += 1;
                return Some(Delivery {
                    topic: self.topic.clone(),
                    partition: partition as i32,
                    offset: position,
                    key: record.key.clone(),
                    payload: record.payload.clone(),
                });
            }
        }
        None
    }
}

#[async_trait]
impl ChannelConsumer for InMemoryConsumer {
    async fn recv(&mut self) -> Result<Option<Delivery>, ChannelError> {
        let shared = Arc::clone(&self.shared);
        loop {
            // Register interest before checking the log so a send between the
            // check and the await is not missed.
            let notified = shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = shared.state.lock().await;
                if let Some(delivery) = self.take_next(&state) {
                    return Ok(Some(delivery));
                }
            }

            if !shared.open.load(Ordering::SeqCst) {
                return Ok(None);
            }

            notified.await;
        }
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), ChannelError> {
        let partition = usize::try_from(delivery.partition)
            .ok()
            .filter(|p| *p < self.shared.partitions)
            .ok_or_else(|| {
                ChannelError::Broker(format!("unknown partition {}", delivery.partition))
            })?;

        let mut state = self.shared.state.lock().await;
        let committed = state
            .committed
            .entry((self.topic.clone(), self.group.clone()))
            .or_insert_with(|| vec![0; self.shared.partitions]);
        committed[partition] = committed[partition].max(delivery.offset + 1);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
