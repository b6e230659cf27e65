//! Fixed account notification texts.
//!
//! Each recognized [`Operation`] maps to exactly one subject/body pair. There
//! is no templating: the recipient is the only variable part of the message.

use crate::envelope::Operation;
use crate::error::UnsupportedOperation;

/// Subject line shared by every account notification.
pub const ACCOUNT_SUBJECT: &str = "account notification";

/// Body sent when an account is created.
pub const ACCOUNT_CREATED_BODY: &str = "Hello! Your account has been successfully created.";

/// Body sent when an account is deleted.
pub const ACCOUNT_DELETED_BODY: &str = "Hello! Your account has been deleted.";

/// Subject and body selected for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationMessage {
    pub subject: &'static str,
    pub body: &'static str,
}

/// Select the message for `operation`.
///
/// Returns [`UnsupportedOperation`] for anything but `CREATE` and
/// `DELETE`. Callers are expected to have classified the operation already.
pub fn message_for(operation: &Operation) -> Result<NotificationMessage, UnsupportedOperation> {
    match operation {
        Operation::Create => Ok(NotificationMessage {
            subject: ACCOUNT_SUBJECT,
            body: ACCOUNT_CREATED_BODY,
        }),
        Operation::Delete => Ok(NotificationMessage {
            subject: ACCOUNT_SUBJECT,
            body: ACCOUNT_DELETED_BODY,
        }),
        Operation::Unrecognized(raw) => Err(UnsupportedOperation(raw.clone())),
    }
}
