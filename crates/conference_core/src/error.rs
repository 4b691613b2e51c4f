//! crates/conference_core/src/error.rs
//!
//! The error taxonomy shared by the lifecycle orchestrators. The API layer
//! maps each variant to an HTTP status; inside the core they are plain
//! domain failures.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Bad or missing input, rejected before any write.
    #[error("{0}")]
    Validation(String),

    /// The bearer credential was absent or did not resolve to an email.
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated, but not an organizer of the target conference.
    #[error("Requester is not an organizer of conference {conference_id}")]
    Forbidden { conference_id: String },

    /// Another conference already holds the exact (name, edition) pair.
    #[error("Conference name and edition already exist")]
    Conflict { name: String, edition: i64 },

    /// The target conference does not exist.
    #[error("Conference {0} not found")]
    ConferenceNotFound(String),

    /// A config required by the operation is absent (client-recoverable).
    #[error("{0} not found")]
    MissingConfig(&'static str),

    /// Unexpected store/runtime failure.
    #[error(transparent)]
    Store(#[from] PortError),
}

impl LifecycleError {
    pub fn validation(message: impl Into<String>) -> Self {
        LifecycleError::Validation(message.into())
    }

    /// A document that should deserialize cleanly did not; always an
    /// internal failure, never the caller's fault.
    pub fn corrupt(context: &str, err: serde_json::Error) -> Self {
        LifecycleError::Store(PortError::Unexpected(format!(
            "malformed {context} document: {err}"
        )))
    }
}
