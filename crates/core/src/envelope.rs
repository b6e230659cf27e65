//! The user lifecycle event envelope.
//!
//! [`UserEvent`] is the single schema shared by the user service (which
//! publishes it) and the notification service (which consumes it). On the
//! wire it is a flat JSON object:
//!
//! ```json
//! {"operation": "CREATE", "email": "someone@example.com"}
//! ```
//!
//! The schema is not versioned. Consumers must tolerate operation values they
//! do not know, so [`Operation`] decodes any string and keeps unknown values
//! as [`Operation::Unrecognized`] instead of failing.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Wire value for a created account.
pub const OP_CREATE: &str = "CREATE";

/// Wire value for a deleted account.
pub const OP_DELETE: &str = "DELETE";

/// Lifecycle operation carried by an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    Create,
    Delete,
    /// Any other value seen on the wire, kept verbatim. Never produced by the
    /// publisher.
    Unrecognized(String),
}

impl Operation {
    /// Parse a wire value. Matching is exact and case-sensitive.
    pub fn parse(value: &str) -> Self {
        match value {
            OP_CREATE => Self::Create,
            OP_DELETE => Self::Delete,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// The wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => OP_CREATE,
            Self::Delete => OP_DELETE,
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl Default for Operation {
    /// An absent `operation` field decodes as an unrecognized empty value.
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl From<String> for Operation {
    fn from(value: String) -> Self {
        match value.as_str() {
            OP_CREATE => Self::Create,
            OP_DELETE => Self::Delete,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UserEvent
// ---------------------------------------------------------------------------

/// A lifecycle fact about one user account.
///
/// Identifies the account only by the email it had at mutation time; no
/// record id is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEvent {
    #[serde(default)]
    pub operation: Operation,
    pub email: String,
}

impl UserEvent {
    pub fn new(operation: Operation, email: impl Into<String>) -> Self {
        Self {
            operation,
            email: email.into(),
        }
    }

    pub fn created(email: impl Into<String>) -> Self {
        Self::new(Operation::Create, email)
    }

    pub fn deleted(email: impl Into<String>) -> Self {
        Self::new(Operation::Delete, email)
    }

    /// Encode as the JSON message value.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a JSON message value.
    ///
    /// Fails only when the payload is not an object or lacks `email`; an
    /// unknown or missing `operation` still decodes.
    pub fn from_bytes(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
