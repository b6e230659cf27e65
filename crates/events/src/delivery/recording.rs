//! In-memory mail sender that records every call.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{MailError, MailSender};

/// One recorded `send_email` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Failure a [`RecordingMailer`] can be scripted to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailFailure {
    /// [`MailError::Unavailable`], retryable.
    Transient,
    /// [`MailError::Rejected`], not retryable.
    Permanent,
}

impl MailFailure {
    fn to_error(self) -> MailError {
        match self {
            Self::Transient => MailError::Unavailable("scripted transient failure".into()),
            Self::Permanent => MailError::Rejected("scripted permanent failure".into()),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    sent: Vec<SentMail>,
    attempts: usize,
    scripted: VecDeque<MailFailure>,
    always: Option<MailFailure>,
}

/// Records calls instead of sending mail.
///
/// Every call counts as an attempt. Only calls that succeed appear in
/// [`sent`](Self::sent). Failures are taken from the script first, then from
/// the permanent failure mode, if any.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    inner: Mutex<Inner>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next calls in order, one scripted failure per call.
    pub fn fail_next(&self, failures: impl IntoIterator<Item = MailFailure>) {
        self.lock().scripted.extend(failures);
    }

    /// Fail every call with `failure` (`None` restores success).
    pub fn fail_always(&self, failure: Option<MailFailure>) {
        self.lock().always = failure;
    }

    /// Successfully sent messages, in call order.
    pub fn sent(&self) -> Vec<SentMail> {
        self.lock().sent.clone()
    }

    /// Number of `send_email` calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave Inner half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        let mut inner = self.lock();
        inner.attempts += 1;

        if let Some(failure) = inner.scripted.pop_front().or(inner.always) {
            return Err(failure.to_error());
        }

        inner.sent.push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn records_successful_calls() {
        let mailer = RecordingMailer::new();
        mailer.send_email("a@example.com", "s", "b").await.unwrap();

        assert_eq!(
            mailer.sent(),
            vec![SentMail {
                recipient: "a@example.com".into(),
                subject: "s".into(),
                body: "b".into(),
            }]
        );
        assert_eq!(mailer.attempts(), 1);
    }

    #[tokio::test]
    async fn scripted_failures_come_first() {
        let mailer = RecordingMailer::new();
        mailer.fail_next([MailFailure::Transient, MailFailure::Permanent]);

        assert_matches!(
            mailer.send_email("a@example.com", "s", "b").await,
            Err(MailError::Unavailable(_))
        );
        assert_matches!(
            mailer.send_email("a@example.com", "s", "b").await,
            Err(MailError::Rejected(_))
        );
        assert!(mailer.send_email("a@example.com", "s", "b").await.is_ok());

        assert_eq!(mailer.attempts(), 3);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn fail_always_until_reset() {
        let mailer = RecordingMailer::new();
        mailer.fail_always(Some(MailFailure::Transient));
        assert!(mailer.send_email("a@example.com", "s", "b").await.is_err());

        mailer.fail_always(None);
        assert!(mailer.send_email("a@example.com", "s", "b").await.is_ok());
    }
}
