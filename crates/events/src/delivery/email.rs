//! Email delivery via SMTP.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport. The transport is
//! built once and reused for every message. Configuration is loaded from
//! environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_lookup`] returns `None` and the notifier falls back to
//! the [`LogMailer`](super::LogMailer).

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use userhub_core::config::{bool_var, parse_var, var, ConfigError, Lookup};

use super::{MailError, MailSender};

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@userhub.local";

/// Configuration for the SMTP mailer.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Upgrade the connection with STARTTLS. Disable only for local relays
    /// such as MailHog.
    pub starttls: bool,
}

impl EmailConfig {
    /// Returns `Ok(None)` if `SMTP_HOST` is not set.
    ///
    /// | Variable         | Required | Default                  |
    /// |------------------|----------|--------------------------|
    /// | `SMTP_HOST`      | yes      |                          |
    /// | `SMTP_PORT`      | no       | `587`                    |
    /// | `SMTP_FROM`      | no       | `noreply@userhub.local`  |
    /// | `SMTP_USER`      | no       |                          |
    /// | `SMTP_PASSWORD`  | no       |                          |
    /// | `SMTP_STARTTLS`  | no       | `true`                   |
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = var(lookup, "SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_var(lookup, "SMTP_PORT", "port number", DEFAULT_SMTP_PORT)?,
            from_address: var(lookup, "SMTP_FROM")
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: var(lookup, "SMTP_USER"),
            smtp_password: var(lookup, "SMTP_PASSWORD"),
            starttls: bool_var(lookup, "SMTP_STARTTLS", true)?,
        }))
    }
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

/// Sends plain-text notification emails via SMTP.
#[derive(Debug)]
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport. No connection is made until the first send.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let from: Mailbox = config.from_address.parse()?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        }
        .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        tracing::info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            starttls = config.starttls,
            "SMTP mailer configured"
        );

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(email).await?;

        tracing::info!(to = recipient, subject, "Notification email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
