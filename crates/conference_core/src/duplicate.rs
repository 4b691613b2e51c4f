//! crates/conference_core/src/duplicate.rs
//!
//! The Duplicate orchestrator: creates a full clone of a conference under a
//! new (name, edition) with its days re-anchored to a new start date, then
//! fans out to side configs, the platform pointer, and activities.
//!
//! Not idempotent: retrying an identical request creates a second,
//! independent clone. Concurrent Duplicate/Delete against the same source id
//! is not mutually excluded; a failure after step 4 leaves the new
//! conference document persisted with a partial set of dependents.

use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::batch::BatchedMutator;
use crate::candidates::find_config_by_conference_id;
use crate::dates::{compute_day_offset, parse_date_prefix, shift_calendar_date, ShiftedDateTime};
use crate::domain::{
    iso_timestamp, Activity, Conference, ConferenceDay, DuplicateReport, DuplicateRequest,
    DEFAULT_DAY_BEGIN_TIME, DEFAULT_DAY_END_TIME,
};
use crate::error::LifecycleError;
use crate::platform::PlatformConfigService;
use crate::ports::{Collection, Document, DocumentStore};

/// Clones `source` into a new conference per `request`.
///
/// All validation happens before the first write; the new conference
/// document is persisted first so every dependent clone can reference its
/// id.
pub async fn duplicate_conference(
    store: &dyn DocumentStore,
    source: &Document,
    request: &DuplicateRequest,
) -> Result<DuplicateReport, LifecycleError> {
    let options = request.options;
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(LifecycleError::validation("Missing conference name"));
    }
    let start_date = parse_start_date(&request.start_date)?;
    if options.planning_structure && !options.rooms {
        return Err(LifecycleError::validation(
            "Planning structure requires rooms to be duplicated",
        ));
    }
    ensure_name_edition_available(store, &name, request.edition).await?;

    let source_conference: Conference = serde_json::from_value(source.data.clone())
        .map_err(|err| LifecycleError::corrupt("conference", err))?;

    info!(
        source_conference_id = %source.id,
        target_name = %name,
        target_edition = request.edition,
        source_day_count = source_conference.days.len(),
        duplicate_rooms = options.rooms,
        duplicate_tracks = options.tracks,
        duplicate_planning_structure = options.planning_structure,
        duplicate_activities = options.activities,
        duplicate_sponsors = options.sponsors,
        "duplicating conference"
    );

    let new_id = store.allocate_id();
    let new_days = build_days(
        &source_conference.days,
        start_date,
        options.planning_structure,
    );

    let mut new_conference = source_conference.clone();
    new_conference.id = new_id.clone();
    new_conference.name = name;
    new_conference.edition = request.edition;
    new_conference.days = new_days;
    new_conference.rooms = if options.rooms {
        source_conference.rooms.clone()
    } else {
        Vec::new()
    };
    new_conference.tracks = if options.tracks {
        source_conference.tracks.clone()
    } else {
        Vec::new()
    };
    new_conference.sponsoring = if options.sponsors {
        source_conference.sponsoring.clone()
    } else {
        None
    };
    new_conference.last_updated = Some(Utc::now().timestamp_millis().to_string());

    let mutator = BatchedMutator::new(store);

    // The conference shell goes first: everything below depends on its id
    // existing. From here on a failure leaves a partial clone behind.
    let payload = serde_json::to_value(&new_conference)
        .map_err(|err| LifecycleError::corrupt("conference", err))?;
    mutator
        .upsert(Collection::Conference, vec![(new_id.clone(), payload)])
        .await?;
    info!(
        source_conference_id = %source.id,
        new_conference_id = %new_id,
        day_count = new_conference.days.len(),
        "conference document created"
    );

    clone_side_config(store, Collection::ConferenceHallConfig, &source.id, &new_id).await?;
    clone_side_config(store, Collection::PublicationConfig, &source.id, &new_id).await?;
    PlatformConfigService::new(store)
        .switch_single_conference(&source.id, &new_id)
        .await?;

    let activities_created = if options.activities {
        clone_activities(
            store,
            &source_conference,
            &source.id,
            &new_id,
            start_date,
            options.planning_structure,
        )
        .await?
    } else {
        info!(source_conference_id = %source.id, "activity duplication disabled");
        0
    };

    let report = DuplicateReport {
        conference_id: new_id.clone(),
        activities_created,
        created_at: iso_timestamp(Utc::now()),
    };
    info!(
        source_conference_id = %source.id,
        new_conference_id = %new_id,
        activities_created,
        "duplicate completed"
    );
    Ok(report)
}

fn parse_start_date(value: &str) -> Result<NaiveDate, LifecycleError> {
    parse_date_prefix(value.trim()).ok_or_else(|| {
        LifecycleError::validation("Invalid startDate format (expected YYYY-MM-DD)")
    })
}

/// Rejects when another conference already holds the exact (name, edition)
/// pair. Exact string comparison on the trimmed name.
async fn ensure_name_edition_available(
    store: &dyn DocumentStore,
    name: &str,
    edition: i64,
) -> Result<(), LifecycleError> {
    let same_name = store
        .find_eq(Collection::Conference, &["name"], &json!(name))
        .await?;
    let conflict = same_name
        .iter()
        .any(|doc| doc.data.get("edition").and_then(Value::as_i64) == Some(edition));
    if conflict {
        warn!(name, edition, "name+edition already exists");
        return Err(LifecycleError::Conflict {
            name: name.to_string(),
            edition,
        });
    }
    Ok(())
}

/// Builds target days: day *i* sits at `start_date + i` with the source day
/// of the same index as template. Slots and disabled rooms are copied
/// verbatim only when the planning structure is requested.
fn build_days(
    source_days: &[ConferenceDay],
    start_date: NaiveDate,
    planning_structure: bool,
) -> Vec<ConferenceDay> {
    let mut sorted: Vec<&ConferenceDay> = source_days.iter().collect();
    sorted.sort_by_key(|day| day.day_index);

    sorted
        .iter()
        .enumerate()
        .map(|(i, template)| ConferenceDay {
            id: template
                .id
                .clone()
                .or_else(|| Some(format!("d{}", i + 1))),
            day_index: i as i64,
            date: (start_date + chrono::Duration::days(i as i64))
                .format("%Y-%m-%d")
                .to_string(),
            begin_time: Some(
                template
                    .begin_time
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DAY_BEGIN_TIME.to_string()),
            ),
            end_time: Some(
                template
                    .end_time
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DAY_END_TIME.to_string()),
            ),
            slots: if planning_structure {
                template.slots.clone()
            } else {
                Vec::new()
            },
            disabled_room_ids: if planning_structure {
                template.disabled_room_ids.clone()
            } else {
                Vec::new()
            },
            extra: serde_json::Map::new(),
        })
        .collect()
}

/// Clones one per-conference side config, when the source has one, with its
/// id and conferenceId rewritten to the target.
async fn clone_side_config(
    store: &dyn DocumentStore,
    collection: Collection,
    source_id: &str,
    target_id: &str,
) -> Result<(), LifecycleError> {
    let Some(config) = find_config_by_conference_id(store, collection, source_id).await? else {
        info!(%collection, source_conference_id = %source_id, "no side config to clone");
        return Ok(());
    };

    let mut data = config.data;
    if let Some(entries) = data.as_object_mut() {
        entries.insert("id".to_string(), json!(target_id));
        entries.insert("conferenceId".to_string(), json!(target_id));
        entries.insert(
            "lastUpdated".to_string(),
            json!(Utc::now().timestamp_millis().to_string()),
        );
    }
    BatchedMutator::new(store)
        .upsert(collection, vec![(target_id.to_string(), data)])
        .await?;
    info!(
        %collection,
        source_doc_id = %config.id,
        target_conference_id = %target_id,
        "side config duplicated"
    );
    Ok(())
}

async fn clone_activities(
    store: &dyn DocumentStore,
    source_conference: &Conference,
    source_id: &str,
    target_id: &str,
    target_start_date: NaiveDate,
    keep_slot_id: bool,
) -> Result<u64, LifecycleError> {
    let docs = store
        .find_eq(Collection::Activity, &["conferenceId"], &json!(source_id))
        .await?;
    if docs.is_empty() {
        info!(source_conference_id = %source_id, "no activities to duplicate");
        return Ok(0);
    }

    // Offset from the source's earliest day; activities of a conference
    // without a well-formed start date keep their dates.
    let day_offset = source_conference
        .start_date()
        .and_then(|date| parse_date_prefix(&date))
        .map(|source_start| compute_day_offset(target_start_date, source_start))
        .unwrap_or(0);
    info!(
        source_conference_id = %source_id,
        target_conference_id = %target_id,
        activity_count = docs.len(),
        day_offset,
        keep_slot_id,
        "cloning activities"
    );

    let now = Utc::now().timestamp_millis().to_string();
    let mut clones = Vec::new();
    for doc in docs {
        let mut activity: Activity = match serde_json::from_value(doc.data) {
            Ok(activity) => activity,
            Err(err) => {
                warn!(activity_id = %doc.id, %err, "skipping malformed activity document");
                continue;
            }
        };
        let clone_id = store.allocate_id();
        activity.id = clone_id.clone();
        activity.conference_id = target_id.to_string();
        activity.start = shift_or_keep(&activity.start, day_offset);
        activity.end = shift_or_keep(&activity.end, day_offset);
        if !keep_slot_id {
            // An unshifted slot reference would point at either nothing or
            // an unrelated slot in the target planning.
            activity.slot_id = None;
        }
        activity.last_updated = Some(now.clone());

        let payload = serde_json::to_value(&activity)
            .map_err(|err| LifecycleError::corrupt("activity", err))?;
        clones.push((clone_id, payload));
    }

    let created = BatchedMutator::new(store)
        .upsert(Collection::Activity, clones)
        .await?;
    Ok(created)
}

fn shift_or_keep(value: &str, day_offset: i64) -> String {
    if value.is_empty() {
        return String::new();
    }
    match shift_calendar_date(value, day_offset) {
        ShiftedDateTime::Shifted(shifted) => shifted,
        ShiftedDateTime::Unrecognized => {
            warn!(value, "activity date kept unshifted: unexpected format");
            value.to_string()
        }
    }
}
