//! Broker and retry configuration.

use std::time::Duration;

use userhub_core::channels::{DEFAULT_DEAD_LETTER_TOPIC, NOTIFICATION_GROUP, USER_EVENTS_TOPIC};
use userhub_core::config::{bool_var, parse_var, var, ConfigError, Lookup};

use crate::channel::DEFAULT_PARTITIONS;
use crate::retry::RetryPolicy;

/// Where the broker lives and which names to use on it.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Kafka bootstrap servers. `None` selects the in-process channel.
    pub brokers: Option<String>,
    /// Topic carrying user lifecycle events.
    pub topic: String,
    /// Consumer group of the notification service.
    pub group_id: String,
    /// Partition count of the in-process channel.
    pub partitions: usize,
}

impl BrokerConfig {
    /// | Env Var                 | Default              |
    /// |-------------------------|----------------------|
    /// | `KAFKA_BROKERS`         | unset (in-process)   |
    /// | `USER_EVENTS_TOPIC`     | `user-events`        |
    /// | `NOTIFICATION_GROUP`    | `notification-group` |
    /// | `IN_MEMORY_PARTITIONS`  | `3`                  |
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            brokers: var(lookup, "KAFKA_BROKERS"),
            topic: var(lookup, "USER_EVENTS_TOPIC").unwrap_or_else(|| USER_EVENTS_TOPIC.into()),
            group_id: var(lookup, "NOTIFICATION_GROUP")
                .unwrap_or_else(|| NOTIFICATION_GROUP.into()),
            partitions: parse_var(lookup, "IN_MEMORY_PARTITIONS", "usize", DEFAULT_PARTITIONS)?,
        })
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            brokers: None,
            topic: USER_EVENTS_TOPIC.into(),
            group_id: NOTIFICATION_GROUP.into(),
            partitions: DEFAULT_PARTITIONS,
        }
    }
}

/// Build a [`RetryPolicy`] from `{retries_key}` plus the shared
/// `RETRY_BASE_DELAY_MS` / `RETRY_MAX_DELAY_MS` variables.
///
/// With the retry count unset (or `0`) this is [`RetryPolicy::none`].
pub fn retry_policy_from_lookup(
    lookup: Lookup<'_>,
    retries_key: &'static str,
) -> Result<RetryPolicy, ConfigError> {
    let max_retries: u32 = parse_var(lookup, retries_key, "u32", 0)?;
    let base_ms: u64 = parse_var(lookup, "RETRY_BASE_DELAY_MS", "u64", 200)?;
    let max_ms: u64 = parse_var(lookup, "RETRY_MAX_DELAY_MS", "u64", 5000)?;

    Ok(RetryPolicy::exponential(
        max_retries,
        Duration::from_millis(base_ms),
        Duration::from_millis(max_ms),
    ))
}

/// Dead-letter topic, if dead-lettering is enabled.
///
/// `DEAD_LETTER_TOPIC` names the topic directly; `DEAD_LETTER_ENABLED=true`
/// alone enables it with the default topic name.
pub fn dead_letter_topic_from_lookup(lookup: Lookup<'_>) -> Result<Option<String>, ConfigError> {
    if let Some(topic) = var(lookup, "DEAD_LETTER_TOPIC") {
        return Ok(Some(topic));
    }
    let enabled = bool_var(lookup, "DEAD_LETTER_ENABLED", false)?;
    Ok(enabled.then(|| DEFAULT_DEAD_LETTER_TOPIC.to_string()))
}
