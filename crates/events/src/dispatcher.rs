//! Classification of incoming envelopes.
//!
//! [`NotificationDispatcher`] is shared by both entry points into the
//! notifier. What differs is how an unrecognized operation is treated, and
//! that is chosen per call with a [`ClassifyPolicy`]:
//!
//! | Path                  | Policy    | Unrecognized / malformed          |
//! |-----------------------|-----------|-----------------------------------|
//! | broker subscription   | `Lenient` | discarded, delivery acknowledged  |
//! | `POST /notifications` | `Strict`  | `InvalidOperation` to the caller  |

use userhub_core::envelope::{Operation, UserEvent};
use userhub_core::error::UnsupportedOperation;

use crate::delivery::MailError;
use crate::resolver::{ActionResolver, ResolveError};

/// How to treat an operation the notifier has no action for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyPolicy {
    /// Discard silently. Producers may emit values this consumer does not
    /// know yet.
    Lenient,
    /// Reject with [`DispatchError::InvalidOperation`].
    Strict,
}

/// Outcome of a dispatch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The mail for this operation was handed to the mail sender.
    Sent(Operation),
    /// Nothing to do (lenient policy only).
    Discarded,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid operation: {0:?}")]
    InvalidOperation(String),

    #[error(transparent)]
    Mail(#[from] MailError),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidOperation(_) => false,
            Self::Mail(err) => err.is_retryable(),
        }
    }
}

impl From<ResolveError> for DispatchError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Mail(e) => Self::Mail(e),
            ResolveError::Unsupported(UnsupportedOperation(op)) => Self::InvalidOperation(op),
        }
    }
}

/// Classifies envelopes and runs the resolver for recognized ones.
#[derive(Clone)]
pub struct NotificationDispatcher {
    resolver: ActionResolver,
}

impl NotificationDispatcher {
    pub fn new(resolver: ActionResolver) -> Self {
        Self { resolver }
    }

    /// Dispatch a decoded envelope.
    pub async fn dispatch(
        &self,
        event: &UserEvent,
        policy: ClassifyPolicy,
    ) -> Result<Dispatch, DispatchError> {
        if !event.operation.is_recognized() {
            return match policy {
                ClassifyPolicy::Lenient => {
                    tracing::warn!(
                        operation = %event.operation,
                        email = %event.email,
                        "Discarding event with unrecognized operation"
                    );
                    Ok(Dispatch::Discarded)
                }
                ClassifyPolicy::Strict => Err(DispatchError::InvalidOperation(
                    event.operation.as_str().to_string(),
                )),
            };
        }

        self.resolver
            .resolve(&event.operation, &event.email)
            .await?;
        Ok(Dispatch::Sent(event.operation.clone()))
    }

    /// Decode a raw payload, then [`dispatch`](Self::dispatch) it.
    ///
    /// A payload that is not a valid envelope counts as unrecognized.
    pub async fn dispatch_payload(
        &self,
        payload: &[u8],
        policy: ClassifyPolicy,
    ) -> Result<Dispatch, DispatchError> {
        match UserEvent::from_bytes(payload) {
            Ok(event) => self.dispatch(&event, policy).await,
            Err(e) => match policy {
                ClassifyPolicy::Lenient => {
                    tracing::warn!(error = %e, "Discarding malformed event payload");
                    Ok(Dispatch::Discarded)
                }
                ClassifyPolicy::Strict => Err(DispatchError::InvalidOperation(format!(
                    "malformed payload: {e}"
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::delivery::{MailFailure, RecordingMailer};
    use assert_matches::assert_matches;

    fn dispatcher() -> (NotificationDispatcher, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = NotificationDispatcher::new(ActionResolver::new(mailer.clone()));
        (dispatcher, mailer)
    }

    #[tokio::test]
    async fn recognized_operation_is_sent_under_both_policies() {
        let (dispatcher, mailer) = dispatcher();
        let event = UserEvent::created("a@example.com");

        for policy in [ClassifyPolicy::Lenient, ClassifyPolicy::Strict] {
            assert_eq!(
                dispatcher.dispatch(&event, policy).await.unwrap(),
                Dispatch::Sent(Operation::Create)
            );
        }
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn lenient_discards_unrecognized_operation() {
        let (dispatcher, mailer) = dispatcher();
        let event = UserEvent::new(Operation::parse("UPDATE"), "a@example.com");

        let outcome = dispatcher
            .dispatch(&event, ClassifyPolicy::Lenient)
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Discarded);
        assert_eq!(mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn strict_rejects_unrecognized_operation() {
        let (dispatcher, mailer) = dispatcher();
        let event = UserEvent::new(Operation::parse("create"), "a@example.com");

        let err = dispatcher
            .dispatch(&event, ClassifyPolicy::Strict)
            .await
            .unwrap_err();

        assert_matches!(err, DispatchError::InvalidOperation(ref op) if op == "create");
        assert_eq!(mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn malformed_payload_follows_policy() {
        let (dispatcher, mailer) = dispatcher();

        assert_eq!(
            dispatcher
                .dispatch_payload(b"not json", ClassifyPolicy::Lenient)
                .await
                .unwrap(),
            Dispatch::Discarded
        );
        assert_matches!(
            dispatcher
                .dispatch_payload(b"{\"operation\":\"CREATE\"}", ClassifyPolicy::Strict)
                .await,
            Err(DispatchError::InvalidOperation(_))
        );
        assert_eq!(mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn absent_operation_is_unrecognized() {
        let (dispatcher, mailer) = dispatcher();

        let outcome = dispatcher
            .dispatch_payload(b"{\"email\":\"a@example.com\"}", ClassifyPolicy::Lenient)
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Discarded);
        assert_eq!(mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn mail_failure_is_an_error_not_a_discard() {
        let (dispatcher, mailer) = dispatcher();
        mailer.fail_next([MailFailure::Transient]);

        let err = dispatcher
            .dispatch(&UserEvent::deleted("a@example.com"), ClassifyPolicy::Lenient)
            .await
            .unwrap_err();

        assert_matches!(err, DispatchError::Mail(MailError::Unavailable(_)));
        assert!(err.is_retryable());
    }
}
