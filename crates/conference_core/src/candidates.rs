//! crates/conference_core/src/candidates.rs
//!
//! Decides which dependent records are safe to touch: person records that
//! may be removed with a conference teardown, and the dual-convention
//! lookup for per-conference side configs.

use serde_json::json;
use tracing::warn;

use crate::domain::Person;
use crate::ports::{Collection, Document, DocumentStore, PortResult};

/// A person that may be deleted together with one conference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonCandidate {
    pub id: String,
    /// Raw email as stored; may be empty when the person never gave one.
    pub email: String,
}

/// Finds every person safe to delete with `conference_id`.
///
/// A person qualifies iff they own no account AND the target conference is
/// the only conference they ever submitted to. A person who submitted to a
/// second conference is never deleted by either conference's teardown.
pub async fn person_deletion_candidates(
    store: &dyn DocumentStore,
    conference_id: &str,
) -> PortResult<Vec<PersonCandidate>> {
    let persons = store
        .find_array_contains(
            Collection::Person,
            &["speaker", "submittedConferenceIds"],
            conference_id,
        )
        .await?;

    let mut candidates = Vec::new();
    for doc in persons {
        let person: Person = match serde_json::from_value(doc.data.clone()) {
            Ok(person) => person,
            Err(err) => {
                warn!(person_id = %doc.id, %err, "skipping malformed person document");
                continue;
            }
        };
        if person.has_account {
            continue;
        }

        let submitted: Vec<String> = person
            .speaker
            .as_ref()
            .map(|speaker| {
                speaker
                    .submitted_conference_ids
                    .iter()
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if submitted.len() != 1 || submitted[0] != conference_id {
            continue;
        }

        candidates.push(PersonCandidate {
            id: doc.id,
            email: person.email.trim().to_string(),
        });
    }
    Ok(candidates)
}

/// Loads a per-conference side config, trying both storage conventions in a
/// fixed order: by `conferenceId` field first, then the conference id used
/// directly as the document id. At most one result is expected.
pub async fn find_config_by_conference_id(
    store: &dyn DocumentStore,
    collection: Collection,
    conference_id: &str,
) -> PortResult<Option<Document>> {
    let by_field = store
        .find_eq(collection, &["conferenceId"], &json!(conference_id))
        .await?;
    if let Some(doc) = by_field.into_iter().next() {
        return Ok(Some(doc));
    }
    store.get(collection, conference_id).await
}

/// Every config document id for `conference_id` across both conventions,
/// deduplicated. Used by Delete, which must remove all of them.
pub async fn config_ids_by_conference_id(
    store: &dyn DocumentStore,
    collection: Collection,
    conference_id: &str,
) -> PortResult<Vec<String>> {
    let mut ids = std::collections::BTreeSet::new();
    for doc in store
        .find_eq(collection, &["conferenceId"], &json!(conference_id))
        .await?
    {
        ids.insert(doc.id);
    }
    if let Some(doc) = store.get(collection, conference_id).await? {
        ids.insert(doc.id);
    }
    Ok(ids.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn person(has_account: bool, submitted: &[&str]) -> serde_json::Value {
        json!({
            "email": "speaker@example.org",
            "hasAccount": has_account,
            "speaker": {"submittedConferenceIds": submitted},
        })
    }

    #[tokio::test]
    async fn only_single_conference_accountless_persons_qualify() {
        let store = MemoryStore::new();
        store.put(Collection::Person, "sole", person(false, &["c1"]));
        store.put(Collection::Person, "account", person(true, &["c1"]));
        store.put(Collection::Person, "two-confs", person(false, &["c1", "c2"]));
        store.put(Collection::Person, "other", person(false, &["c2"]));

        let candidates = person_deletion_candidates(&store, "c1").await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "sole");
        assert_eq!(candidates[0].email, "speaker@example.org");
    }

    #[tokio::test]
    async fn config_lookup_tries_field_then_doc_id() {
        let store = MemoryStore::new();
        store.put(
            Collection::ConferenceHallConfig,
            "generated-id",
            json!({"conferenceId": "c1", "lastCommunication": "2024-01-01T00:00:00Z"}),
        );
        store.put(
            Collection::ConferenceHallConfig,
            "c2",
            json!({"conferenceName": "direct"}),
        );

        let by_field = find_config_by_conference_id(&store, Collection::ConferenceHallConfig, "c1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_field.id, "generated-id");

        let by_doc_id = find_config_by_conference_id(&store, Collection::ConferenceHallConfig, "c2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_doc_id.id, "c2");

        let missing = find_config_by_conference_id(&store, Collection::ConferenceHallConfig, "c3")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn config_ids_deduplicate_across_conventions() {
        let store = MemoryStore::new();
        // One doc stored under the doc-id convention that also carries the
        // conferenceId field: both lookups hit the same document.
        store.put(
            Collection::PublicationConfig,
            "c1",
            json!({"conferenceId": "c1"}),
        );
        let ids = config_ids_by_conference_id(&store, Collection::PublicationConfig, "c1")
            .await
            .unwrap();
        assert_eq!(ids, vec!["c1".to_string()]);
    }
}
