use std::time::Duration;

use userhub_core::config::{parse_var, process_env, ConfigError, HttpConfig, Lookup};
use userhub_events::config::{dead_letter_topic_from_lookup, retry_policy_from_lookup};
use userhub_events::{BrokerConfig, EmailConfig, RetryPolicy};

/// Default listen port of the notification service.
pub const DEFAULT_PORT: u16 = 8081;

/// Notification service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub http: HttpConfig,
    pub broker: BrokerConfig,
    /// SMTP settings; `None` selects the logging mailer.
    pub email: Option<EmailConfig>,
    /// Upper bound for one mail call (`MAIL_TIMEOUT_SECS`, default 10).
    pub mail_timeout: Duration,
    /// Retries for retryable mail failures on the broker path
    /// (`MAIL_MAX_RETRIES`, default 0).
    pub mail_retry: RetryPolicy,
    /// Dead-letter topic; `None` disables dead-lettering.
    pub dead_letter_topic: Option<String>,
}

impl NotifierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    /// | Env Var                | Default           |
    /// |------------------------|-------------------|
    /// | `PORT`                 | `8081`            |
    /// | `MAIL_TIMEOUT_SECS`    | `10`              |
    /// | `MAIL_MAX_RETRIES`     | `0`               |
    /// | `DEAD_LETTER_TOPIC`    | unset (disabled)  |
    /// | `DEAD_LETTER_ENABLED`  | `false`           |
    ///
    /// plus the shared HTTP, broker, SMTP and retry delay variables.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let mail_timeout_secs: u64 = parse_var(lookup, "MAIL_TIMEOUT_SECS", "u64", 10)?;

        Ok(Self {
            http: HttpConfig::from_lookup(lookup, DEFAULT_PORT)?,
            broker: BrokerConfig::from_lookup(lookup)?,
            email: EmailConfig::from_lookup(lookup)?,
            mail_timeout: Duration::from_secs(mail_timeout_secs),
            mail_retry: retry_policy_from_lookup(lookup, "MAIL_MAX_RETRIES")?,
            dead_letter_topic: dead_letter_topic_from_lookup(lookup)?,
        })
    }
}
