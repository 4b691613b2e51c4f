//! crates/conference_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like the
//! document database or the identity provider.

use async_trait::async_trait;
use serde_json::Value;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Collections
//=========================================================================================

/// The fixed set of document collections this core reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Conference,
    ConferenceDashboard,
    ConferenceDashboardHistory,
    ConferenceHallConfig,
    PublicationConfig,
    ConferenceSecret,
    Session,
    Person,
    PersonEmailIndex,
    ConferenceSpeaker,
    Activity,
    ActivityParticipation,
    SessionAllocation,
    PlatformConfig,
    AccessToken,
}

impl Collection {
    /// Stable on-disk collection name.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Conference => "conference",
            Collection::ConferenceDashboard => "conference-dashboard",
            Collection::ConferenceDashboardHistory => "conference-dashboard-history",
            Collection::ConferenceHallConfig => "conference-hall-config",
            Collection::PublicationConfig => "publication-config",
            Collection::ConferenceSecret => "conferenceSecret",
            Collection::Session => "session",
            Collection::Person => "person",
            Collection::PersonEmailIndex => "person_emails",
            Collection::ConferenceSpeaker => "conference-speaker",
            Collection::Activity => "activity",
            Collection::ActivityParticipation => "activityParticipation",
            Collection::SessionAllocation => "session-allocation",
            Collection::PlatformConfig => "platform-config",
            Collection::AccessToken => "access-token",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored document together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// One write in an atomic batch commit.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Full overwrite of the document (upsert).
    Set {
        collection: Collection,
        id: String,
        data: Value,
    },
    /// Removal; deleting a missing id is a no-op.
    Delete { collection: Collection, id: String },
}

impl WriteOp {
    pub fn set(collection: Collection, id: impl Into<String>, data: Value) -> Self {
        WriteOp::Set {
            collection,
            id: id.into(),
            data,
        }
    }

    pub fn delete(collection: Collection, id: impl Into<String>) -> Self {
        WriteOp::Delete {
            collection,
            id: id.into(),
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The document database boundary.
///
/// `commit` applies all ops of one call atomically; callers are responsible
/// for staying under the store's per-commit op limit (see the batched
/// mutator). Query methods address nested fields with a path of keys, e.g.
/// `&["conference", "conferenceId"]`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> PortResult<Option<Document>>;

    async fn list(&self, collection: Collection) -> PortResult<Vec<Document>>;

    /// All documents whose field at `field_path` equals `value`.
    async fn find_eq(
        &self,
        collection: Collection,
        field_path: &[&str],
        value: &Value,
    ) -> PortResult<Vec<Document>>;

    /// All documents whose array at `field_path` contains the string `value`.
    async fn find_array_contains(
        &self,
        collection: Collection,
        field_path: &[&str],
        value: &str,
    ) -> PortResult<Vec<Document>>;

    /// Atomically applies every op, or none of them.
    async fn commit(&self, ops: Vec<WriteOp>) -> PortResult<()>;

    /// Mints a fresh, store-unique document id.
    fn allocate_id(&self) -> String;
}

/// Resolves an opaque bearer credential to the requester's email.
/// Returns `Ok(None)` for an unknown or expired credential; only transport
/// and storage failures surface as errors.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn resolve_email(&self, bearer_token: &str) -> PortResult<Option<String>>;
}
