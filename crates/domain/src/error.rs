//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RainHubError`] via `#[from]` or an explicit `From` impl. The
//! [`RainHubError::Storage`] variant carries adapter errors across port
//! boundaries without the domain knowing their concrete types.

/// Base error enum crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum RainHubError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// An inbound payload could not be parsed.
    #[error("failed to parse payload")]
    Parse(#[source] serde_json::Error),

    /// An adapter-level failure (database, broker, ...).
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A name field was empty.
    #[error("name must not be empty")]
    EmptyName,

    /// An inbound payload was not a JSON object.
    #[error("payload must be a JSON object")]
    PayloadNotObject,
}

/// A lookup by identifier found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of record, e.g. `"Topic"`.
    pub entity: &'static str,
    /// Identifier that was looked up.
    pub id: String,
}

impl NotFoundError {
    #[must_use]
    pub fn topic(id: crate::id::TopicId) -> Self {
        Self {
            entity: "Topic",
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn automation(id: crate::id::AutomationId) -> Self {
        Self {
            entity: "Automation",
            id: id.to_string(),
        }
    }
}
