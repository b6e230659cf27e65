//! Mail sender that only logs.

use async_trait::async_trait;

use super::{MailError, MailSender};

/// Logs each message at `info` instead of sending it.
///
/// Used by the notifier when no SMTP relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl MailSender for LogMailer {
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        tracing::info!(to = recipient, subject, body, "Email not sent (no SMTP relay)");
        Ok(())
    }
}
