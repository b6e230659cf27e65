use userhub_core::config::{bool_var, process_env, var, ConfigError, HttpConfig, Lookup};
use userhub_events::config::retry_policy_from_lookup;
use userhub_events::{BrokerConfig, PartitionKey, RetryPolicy};

/// Default listen port of the user service.
pub const DEFAULT_PORT: u16 = 8080;

/// User service configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development: without
/// `DATABASE_URL` users are kept in memory, and without `KAFKA_BROKERS`
/// events go to an in-process channel.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http: HttpConfig,
    pub broker: BrokerConfig,
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Key published envelopes by email (`PARTITION_BY_EMAIL`, default off).
    pub partition_key: PartitionKey,
    /// Retries for an unavailable channel (`PUBLISH_MAX_RETRIES`, default 0).
    pub publish_retry: RetryPolicy,
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    /// | Env Var               | Default            |
    /// |-----------------------|--------------------|
    /// | `PORT`                | `8080`             |
    /// | `DATABASE_URL`        | unset (in memory)  |
    /// | `PARTITION_BY_EMAIL`  | `false`            |
    /// | `PUBLISH_MAX_RETRIES` | `0`                |
    ///
    /// plus the shared HTTP, broker and retry delay variables.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let partition_key = if bool_var(lookup, "PARTITION_BY_EMAIL", false)? {
            PartitionKey::Email
        } else {
            PartitionKey::None
        };

        Ok(Self {
            http: HttpConfig::from_lookup(lookup, DEFAULT_PORT)?,
            broker: BrokerConfig::from_lookup(lookup)?,
            database_url: var(lookup, "DATABASE_URL"),
            partition_key,
            publish_retry: retry_policy_from_lookup(lookup, "PUBLISH_MAX_RETRIES")?,
        })
    }
}
