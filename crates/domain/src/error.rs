//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`MailflowError`] via `From`, so port boundaries only ever carry this type.

/// Top-level error for every mailflow operation.
#[derive(Debug, thiserror::Error)]
pub enum MailflowError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The message-delivery collaborator rejected or failed a send.
    #[error("delivery error")]
    Delivery(#[from] DeliveryError),

    /// A persistence adapter failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("email address must not be empty")]
    EmptyAddress,

    #[error("a subscriber with address {0} already exists")]
    DuplicateAddress(String),

    #[error("step order must be contiguous from 0: expected {expected}, found {found}")]
    NonContiguousStepOrder { expected: u32, found: u32 },

    #[error("step {order} is malformed: {reason}")]
    MalformedStep { order: u32, reason: String },

    #[error("a delay of {minutes} minutes ends too far in the future")]
    DelayOutOfRange { minutes: u32 },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("unknown trigger category: {0}")]
    UnknownTriggerCategory(String),

    #[error("unknown run status: {0}")]
    UnknownRunStatus(String),

    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Failure reported by the message-delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("message delivery failed: {reason}")]
pub struct DeliveryError {
    pub reason: String,
}

impl DeliveryError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
