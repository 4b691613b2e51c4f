//! crates/conference_core/src/delete.rs
//!
//! The Delete orchestrator: irrevocably removes a conference and every
//! dependent record. Dependents go first, the root document strictly last:
//! a crash mid-cascade leaves dangling dependents behind a still-existing
//! conference id, which a re-run cleans up. Safe to retry blindly; a re-run
//! on an already-deleted id reports all-zero counts.

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::batch::BatchedMutator;
use crate::candidates::{config_ids_by_conference_id, person_deletion_candidates};
use crate::domain::{iso_timestamp, DeleteReport};
use crate::error::LifecycleError;
use crate::ports::{Collection, DocumentStore, WriteOp};

pub async fn delete_conference(
    store: &dyn DocumentStore,
    conference_id: &str,
) -> Result<DeleteReport, LifecycleError> {
    let mutator = BatchedMutator::new(store);

    let mut report = DeleteReport {
        sessions_deleted: delete_by_field(
            store,
            &mutator,
            Collection::Session,
            &["conference", "conferenceId"],
            conference_id,
        )
        .await?,
        conference_speakers_deleted: delete_by_field(
            store,
            &mutator,
            Collection::ConferenceSpeaker,
            &["conferenceId"],
            conference_id,
        )
        .await?,
        activity_participations_deleted: delete_by_field(
            store,
            &mutator,
            Collection::ActivityParticipation,
            &["conferenceId"],
            conference_id,
        )
        .await?,
        activities_deleted: delete_by_field(
            store,
            &mutator,
            Collection::Activity,
            &["conferenceId"],
            conference_id,
        )
        .await?,
        session_allocations_deleted: delete_by_field(
            store,
            &mutator,
            Collection::SessionAllocation,
            &["conferenceId"],
            conference_id,
        )
        .await?,
        conference_secrets_deleted: delete_by_field(
            store,
            &mutator,
            Collection::ConferenceSecret,
            &["conferenceId"],
            conference_id,
        )
        .await?,
        ..DeleteReport::default()
    };

    report.conference_hall_configs_deleted =
        delete_side_configs(store, &mutator, Collection::ConferenceHallConfig, conference_id)
            .await?;
    report.publication_configs_deleted =
        delete_side_configs(store, &mutator, Collection::PublicationConfig, conference_id)
            .await?;
    report.dashboards_deleted = delete_dashboards(store, &mutator, conference_id).await?;
    report.persons_deleted = delete_candidate_persons(store, &mutator, conference_id).await?;

    // Root last.
    if store.get(Collection::Conference, conference_id).await?.is_some() {
        report.conference_deleted = mutator
            .delete_ids(Collection::Conference, vec![conference_id.to_string()])
            .await?;
    }
    report.deleted_at = iso_timestamp(Utc::now());

    info!(
        conference_id,
        sessions = report.sessions_deleted,
        conference_speakers = report.conference_speakers_deleted,
        persons = report.persons_deleted,
        activities = report.activities_deleted,
        activity_participations = report.activity_participations_deleted,
        session_allocations = report.session_allocations_deleted,
        conference_hall_configs = report.conference_hall_configs_deleted,
        publication_configs = report.publication_configs_deleted,
        conference_secrets = report.conference_secrets_deleted,
        dashboards = report.dashboards_deleted,
        conference = report.conference_deleted,
        "delete completed"
    );
    Ok(report)
}

async fn delete_by_field(
    store: &dyn DocumentStore,
    mutator: &BatchedMutator<'_>,
    collection: Collection,
    field_path: &[&str],
    conference_id: &str,
) -> Result<u64, LifecycleError> {
    let docs = store
        .find_eq(collection, field_path, &json!(conference_id))
        .await?;
    let ids: Vec<String> = docs.into_iter().map(|doc| doc.id).collect();
    if ids.is_empty() {
        return Ok(0);
    }
    Ok(mutator.delete_ids(collection, ids).await?)
}

/// Side configs may live under either storage convention; ids from both
/// lookups are deduplicated before deleting.
async fn delete_side_configs(
    store: &dyn DocumentStore,
    mutator: &BatchedMutator<'_>,
    collection: Collection,
    conference_id: &str,
) -> Result<u64, LifecycleError> {
    let ids = config_ids_by_conference_id(store, collection, conference_id).await?;
    if ids.is_empty() {
        return Ok(0);
    }
    Ok(mutator.delete_ids(collection, ids).await?)
}

/// The dashboard cache and its history are derived data; they never outlive
/// their conference.
async fn delete_dashboards(
    store: &dyn DocumentStore,
    mutator: &BatchedMutator<'_>,
    conference_id: &str,
) -> Result<u64, LifecycleError> {
    let mut deleted = 0;
    if store
        .get(Collection::ConferenceDashboard, conference_id)
        .await?
        .is_some()
    {
        deleted += mutator
            .delete_ids(Collection::ConferenceDashboard, vec![conference_id.to_string()])
            .await?;
    }
    deleted += delete_by_field(
        store,
        mutator,
        Collection::ConferenceDashboardHistory,
        &["conferenceId"],
        conference_id,
    )
    .await?;
    Ok(deleted)
}

/// Each candidate person is deleted together with its companion
/// lowercased-email index record, in the same atomic chunk.
async fn delete_candidate_persons(
    store: &dyn DocumentStore,
    mutator: &BatchedMutator<'_>,
    conference_id: &str,
) -> Result<u64, LifecycleError> {
    let candidates = person_deletion_candidates(store, conference_id).await?;
    if candidates.is_empty() {
        return Ok(0);
    }

    let groups: Vec<Vec<WriteOp>> = candidates
        .into_iter()
        .map(|candidate| {
            let mut group = vec![WriteOp::delete(Collection::Person, candidate.id)];
            let email_key = candidate.email.to_lowercase();
            if !email_key.is_empty() {
                group.push(WriteOp::delete(Collection::PersonEmailIndex, email_key));
            }
            group
        })
        .collect();
    Ok(mutator.commit_grouped(groups).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.put(
            Collection::Conference,
            "c1",
            json!({"id": "c1", "name": "DevCon", "edition": 5,
                   "organizerEmails": ["orga@devcon.io"], "days": []}),
        );
        store.put(
            Collection::Session,
            "s1",
            json!({"conference": {"conferenceId": "c1", "status": "SUBMITTED", "sessionTypeId": "st1"}}),
        );
        store.put(
            Collection::Session,
            "s2",
            json!({"conference": {"conferenceId": "other", "status": "SUBMITTED", "sessionTypeId": "st1"}}),
        );
        store.put(Collection::ConferenceSpeaker, "cs1", json!({"conferenceId": "c1"}));
        store.put(Collection::Activity, "a1", json!({"conferenceId": "c1"}));
        store.put(
            Collection::ActivityParticipation,
            "ap1",
            json!({"conferenceId": "c1", "activityId": "a1", "personId": "p1"}),
        );
        store.put(
            Collection::SessionAllocation,
            "al1",
            json!({"conferenceId": "c1", "slotId": "sl1", "sessionId": "s1"}),
        );
        store.put(Collection::ConferenceSecret, "sec1", json!({"conferenceId": "c1"}));
        store.put(
            Collection::ConferenceHallConfig,
            "hall-1",
            json!({"conferenceId": "c1"}),
        );
        store.put(Collection::PublicationConfig, "c1", json!({"conferenceId": "c1"}));
        store.put(
            Collection::ConferenceDashboard,
            "c1",
            json!({"conferenceId": "c1", "schemaVersion": 1}),
        );
        store.put(
            Collection::ConferenceDashboardHistory,
            "h1",
            json!({"conferenceId": "c1"}),
        );
        store.put(
            Collection::Person,
            "p-sole",
            json!({"email": "Sole.Speaker@Example.org", "hasAccount": false,
                   "speaker": {"submittedConferenceIds": ["c1"]}}),
        );
        store.put(
            Collection::PersonEmailIndex,
            "sole.speaker@example.org",
            json!({"personId": "p-sole"}),
        );
        store.put(
            Collection::Person,
            "p-account",
            json!({"email": "has.account@example.org", "hasAccount": true,
                   "speaker": {"submittedConferenceIds": ["c1"]}}),
        );
        store.put(
            Collection::Person,
            "p-two",
            json!({"email": "two.confs@example.org", "hasAccount": false,
                   "speaker": {"submittedConferenceIds": ["c1", "c2"]}}),
        );
        store
    }

    #[tokio::test]
    async fn cascade_removes_every_dependent_kind_and_the_root_last() {
        let store = seeded_store();

        let report = delete_conference(&store, "c1").await.unwrap();

        assert_eq!(report.conference_deleted, 1);
        assert_eq!(report.sessions_deleted, 1);
        assert_eq!(report.conference_speakers_deleted, 1);
        assert_eq!(report.activities_deleted, 1);
        assert_eq!(report.activity_participations_deleted, 1);
        assert_eq!(report.session_allocations_deleted, 1);
        assert_eq!(report.conference_secrets_deleted, 1);
        assert_eq!(report.conference_hall_configs_deleted, 1);
        assert_eq!(report.publication_configs_deleted, 1);
        assert_eq!(report.dashboards_deleted, 2);
        assert_eq!(report.persons_deleted, 1);
        assert!(!report.deleted_at.is_empty());

        assert!(store.get(Collection::Conference, "c1").await.unwrap().is_none());
        // Unrelated records survive.
        assert!(store.get(Collection::Session, "s2").await.unwrap().is_some());
        // The shared and account-holding persons survive, with their index.
        assert!(store.get(Collection::Person, "p-account").await.unwrap().is_some());
        assert!(store.get(Collection::Person, "p-two").await.unwrap().is_some());
        assert!(store.get(Collection::Person, "p-sole").await.unwrap().is_none());
        assert!(store
            .get(Collection::PersonEmailIndex, "sole.speaker@example.org")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn rerunning_delete_reports_all_zero_counts() {
        let store = seeded_store();
        delete_conference(&store, "c1").await.unwrap();

        let rerun = delete_conference(&store, "c1").await.unwrap();
        assert_eq!(rerun.conference_deleted, 0);
        assert_eq!(rerun.sessions_deleted, 0);
        assert_eq!(rerun.persons_deleted, 0);
        assert_eq!(rerun.activities_deleted, 0);
        assert_eq!(rerun.dashboards_deleted, 0);
    }

    #[tokio::test]
    async fn duplicate_then_delete_leaves_the_source_untouched() {
        use crate::domain::{DuplicateOptions, DuplicateRequest};
        use crate::duplicate::duplicate_conference;

        let store = seeded_store();
        let source = store
            .get(Collection::Conference, "c1")
            .await
            .unwrap()
            .unwrap();
        let report = duplicate_conference(
            &store,
            &source,
            &DuplicateRequest {
                name: "DevCon".to_string(),
                edition: 6,
                start_date: "2024-03-01".to_string(),
                options: DuplicateOptions {
                    rooms: true,
                    tracks: true,
                    planning_structure: true,
                    activities: true,
                    sponsors: true,
                },
            },
        )
        .await
        .unwrap();

        let clone_id = report.conference_id.clone();
        delete_conference(&store, &clone_id).await.unwrap();

        // Every clone-scoped collection is empty again.
        for collection in [
            Collection::Activity,
            Collection::ConferenceHallConfig,
            Collection::PublicationConfig,
        ] {
            let rest = store
                .find_eq(collection, &["conferenceId"], &json!(clone_id))
                .await
                .unwrap();
            assert!(rest.is_empty(), "{collection} still holds clone records");
        }
        assert!(store
            .get(Collection::Conference, &clone_id)
            .await
            .unwrap()
            .is_none());
        // The source conference and its dependents are intact.
        assert!(store.get(Collection::Conference, "c1").await.unwrap().is_some());
        assert!(store.get(Collection::Session, "s1").await.unwrap().is_some());
        assert!(store.get(Collection::Activity, "a1").await.unwrap().is_some());
    }
}
