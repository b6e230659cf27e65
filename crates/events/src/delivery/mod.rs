//! Outbound mail delivery.
//!
//! [`MailSender`] is the seam between the notification logic and the mail
//! transport. Implementations:
//!
//! - [`SmtpMailer`]: `lettre` SMTP transport, used when `SMTP_HOST` is set.
//! - [`LogMailer`]: writes the message to the log instead of sending it.
//! - [`RecordingMailer`]: keeps every call in memory, optionally failing.

use std::time::Duration;

use async_trait::async_trait;

pub mod email;
pub mod log;
pub mod recording;

pub use email::{EmailConfig, SmtpMailer};
pub use log::LogMailer;
pub use recording::{MailFailure, RecordingMailer, SentMail};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for mail delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, response).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The mail call did not finish in time.
    #[error("Mail delivery timed out after {0:?}")]
    Timeout(Duration),

    /// The mail relay is temporarily not accepting messages.
    #[error("Mail relay unavailable: {0}")]
    Unavailable(String),

    /// The mail relay refused the message for good.
    #[error("Mail rejected: {0}")]
    Rejected(String),
}

impl MailError {
    /// Whether the same send may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => !err.is_permanent(),
            Self::Timeout(_) | Self::Unavailable(_) => true,
            Self::Address(_) | Self::Build(_) | Self::Rejected(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// MailSender
// ---------------------------------------------------------------------------

/// Sends one plain-text message to one recipient.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_email(&self, recipient: &str, subject: &str, body: &str)
        -> Result<(), MailError>;
}
