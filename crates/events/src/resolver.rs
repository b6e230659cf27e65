//! Maps a recognized operation to its mail and sends it.

use std::sync::Arc;
use std::time::Duration;

use userhub_core::envelope::Operation;
use userhub_core::error::UnsupportedOperation;
use userhub_core::templates::message_for;

use crate::delivery::{MailError, MailSender};

/// Default upper bound for a single mail call.
pub const DEFAULT_MAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for [`ActionResolver::resolve`].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperation),

    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Stateless: one mail call per resolution, no retry.
#[derive(Clone)]
pub struct ActionResolver {
    mailer: Arc<dyn MailSender>,
    timeout: Duration,
}

impl ActionResolver {
    pub fn new(mailer: Arc<dyn MailSender>) -> Self {
        Self {
            mailer,
            timeout: DEFAULT_MAIL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send the fixed message for `operation` to `email`.
    pub async fn resolve(&self, operation: &Operation, email: &str) -> Result<(), ResolveError> {
        let message = message_for(operation)?;

        tokio::time::timeout(
            self.timeout,
            self.mailer.send_email(email, message.subject, message.body),
        )
        .await
        .map_err(|_| MailError::Timeout(self.timeout))??;

        tracing::info!(%operation, email, "Account notification sent");
        Ok(())
    }
}
