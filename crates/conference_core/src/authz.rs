//! crates/conference_core/src/authz.rs
//!
//! The authorization gate: resolves a bearer credential to a requester
//! email and checks organizer membership on a conference. No side effects.

use tracing::{debug, warn};

use crate::domain::Conference;
use crate::error::LifecycleError;
use crate::ports::{Collection, Document, DocumentStore, TokenVerifier};

/// Resolves the `Authorization` header value to a requester email.
///
/// Accepts the credential with or without the `Bearer ` scheme prefix.
/// Fails with `Unauthenticated` when the header is absent, blank, or does
/// not resolve to a known identity.
pub async fn resolve_requester_email(
    verifier: &dyn TokenVerifier,
    authorization: Option<&str>,
) -> Result<String, LifecycleError> {
    let token = authorization
        .map(|header| header.strip_prefix("Bearer ").unwrap_or(header).trim())
        .filter(|token| !token.is_empty())
        .ok_or(LifecycleError::Unauthenticated)?;

    match verifier.resolve_email(token).await? {
        Some(email) => Ok(email),
        None => {
            warn!("bearer credential did not resolve to a requester email");
            Err(LifecycleError::Unauthenticated)
        }
    }
}

/// Loaded conference plus the requester it was authorized for.
#[derive(Debug)]
pub struct AuthorizedConference {
    pub conference: Conference,
    /// Raw document, for orchestrators that clone it verbatim.
    pub document: Document,
    pub requester_email: String,
}

/// Loads the conference and verifies the requester is one of its organizers.
pub async fn ensure_requester_is_organizer(
    store: &dyn DocumentStore,
    conference_id: &str,
    requester_email: &str,
) -> Result<AuthorizedConference, LifecycleError> {
    let document = store
        .get(Collection::Conference, conference_id)
        .await?
        .ok_or_else(|| LifecycleError::ConferenceNotFound(conference_id.to_string()))?;

    let conference: Conference = serde_json::from_value(document.data.clone())
        .map_err(|err| LifecycleError::corrupt("conference", err))?;

    if !conference.is_organizer(requester_email) {
        warn!(
            conference_id,
            requester_email, "requester is not an organizer"
        );
        return Err(LifecycleError::Forbidden {
            conference_id: conference_id.to_string(),
        });
    }

    debug!(conference_id, requester_email, "requester authorized");
    Ok(AuthorizedConference {
        conference,
        document,
        requester_email: requester_email.to_string(),
    })
}
