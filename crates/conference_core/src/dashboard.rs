//! crates/conference_core/src/dashboard.rs
//!
//! The Dashboard orchestrator: recomputes the derived statistics snapshot
//! for one conference from current Session/SessionAllocation/Slot state,
//! overwrites the dashboard document and appends an immutable history entry.
//! Safe to retry blindly. The daily sweep walks every conference one at a
//! time under a fixed wall-clock budget.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use tracing::{error, info, warn};

use crate::batch::BatchedMutator;
use crate::candidates::find_config_by_conference_id;
use crate::domain::{
    iso_timestamp, Conference, ConferenceDashboard, ConferenceHallConfig, DashboardConferenceHall,
    DashboardCounts, DashboardReport, DashboardSchedule, DashboardSlots, DashboardSpeakers,
    DashboardTrigger, Session, SessionAllocation,
};
use crate::error::LifecycleError;
use crate::ports::{Collection, Document, DocumentStore};

/// Current dashboard document layout version.
pub const DASHBOARD_SCHEMA_VERSION: u32 = 1;

/// A finished event has nothing left to refresh: only conferences whose
/// earliest day date is strictly in the future are swept.
pub fn is_conference_start_in_future(conference: &Conference, today: NaiveDate) -> bool {
    conference
        .start_date()
        .and_then(|date| NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok())
        .is_some_and(|start| start > today)
}

/// Recomputes the dashboard for `conference_doc` and persists it: the
/// dashboard document is overwritten (never merge-accumulated) and a history
/// entry is appended under a fresh id.
pub async fn recompute_and_persist(
    store: &dyn DocumentStore,
    conference_doc: &Document,
    trigger: DashboardTrigger,
    now: DateTime<Utc>,
) -> Result<DashboardReport, LifecycleError> {
    let conference: Conference = serde_json::from_value(conference_doc.data.clone())
        .map_err(|err| LifecycleError::corrupt("conference", err))?;
    let conference_id = conference_doc.id.as_str();

    let sessions = load_sessions(store, conference_id).await?;
    let allocations = load_allocations(store, conference_id).await?;
    let hall_config = load_hall_config(store, conference_id).await?;

    let dashboard = compute_dashboard(
        conference_id,
        &conference,
        &sessions,
        &allocations,
        hall_config.as_ref(),
        trigger,
        now,
    );

    let mutator = BatchedMutator::new(store);
    let payload = serde_json::to_value(&dashboard)
        .map_err(|err| LifecycleError::corrupt("dashboard", err))?;
    mutator
        .upsert(
            Collection::ConferenceDashboard,
            vec![(conference_id.to_string(), payload)],
        )
        .await?;

    let history_id = store.allocate_id();
    let mut history_entry = serde_json::to_value(&dashboard)
        .map_err(|err| LifecycleError::corrupt("dashboard", err))?;
    if let Some(entries) = history_entry.as_object_mut() {
        entries.insert("id".to_string(), json!(history_id));
    }
    mutator
        .upsert(
            Collection::ConferenceDashboardHistory,
            vec![(history_id.clone(), history_entry)],
        )
        .await?;

    info!(
        conference_id,
        ?trigger,
        history_id = %history_id,
        computed_at = %dashboard.computed_at,
        "dashboard recomputed"
    );
    Ok(DashboardReport {
        history_id,
        dashboard,
    })
}

/// Totals of one daily sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepTotals {
    pub conferences: u64,
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
    /// False when the wall-clock budget ran out before the last conference.
    pub completed: bool,
}

/// Walks every conference, strictly one at a time, refreshing dashboards of
/// upcoming conferences. A single conference's failure increments `failed`
/// and never stops the sweep; the budget check logs how far the sweep got.
pub async fn run_daily_sweep(
    store: &dyn DocumentStore,
    now: DateTime<Utc>,
    budget: Duration,
) -> Result<SweepTotals, LifecycleError> {
    let started = Instant::now();
    let today = now.date_naive();
    let conferences = store.list(Collection::Conference).await?;

    let mut totals = SweepTotals {
        conferences: conferences.len() as u64,
        completed: true,
        ..SweepTotals::default()
    };
    info!(conferences = totals.conferences, "dashboard sweep started");

    for doc in conferences {
        if started.elapsed() >= budget {
            totals.completed = false;
            warn!(
                processed = totals.processed,
                skipped = totals.skipped,
                failed = totals.failed,
                remaining = totals.conferences - totals.processed - totals.skipped - totals.failed,
                "dashboard sweep budget exhausted"
            );
            break;
        }

        let conference: Conference = match serde_json::from_value(doc.data.clone()) {
            Ok(conference) => conference,
            Err(err) => {
                totals.failed += 1;
                error!(conference_id = %doc.id, %err, "sweep failed on malformed conference");
                continue;
            }
        };
        if !is_conference_start_in_future(&conference, today) {
            totals.skipped += 1;
            continue;
        }

        match recompute_and_persist(store, &doc, DashboardTrigger::ScheduledDaily, now).await {
            Ok(_) => totals.processed += 1,
            Err(err) => {
                totals.failed += 1;
                error!(conference_id = %doc.id, %err, "sweep failed on conference");
            }
        }
    }

    info!(
        conferences = totals.conferences,
        processed = totals.processed,
        skipped = totals.skipped,
        failed = totals.failed,
        completed = totals.completed,
        "dashboard sweep completed"
    );
    Ok(totals)
}

async fn load_sessions(
    store: &dyn DocumentStore,
    conference_id: &str,
) -> Result<Vec<Session>, LifecycleError> {
    let docs = store
        .find_eq(
            Collection::Session,
            &["conference", "conferenceId"],
            &json!(conference_id),
        )
        .await?;
    let mut sessions = Vec::with_capacity(docs.len());
    for doc in docs {
        match serde_json::from_value::<Session>(doc.data) {
            Ok(session) => sessions.push(session),
            Err(err) => {
                warn!(session_id = %doc.id, %err, "skipping malformed session document");
            }
        }
    }
    Ok(sessions)
}

async fn load_allocations(
    store: &dyn DocumentStore,
    conference_id: &str,
) -> Result<Vec<SessionAllocation>, LifecycleError> {
    let docs = store
        .find_eq(
            Collection::SessionAllocation,
            &["conferenceId"],
            &json!(conference_id),
        )
        .await?;
    let mut allocations = Vec::with_capacity(docs.len());
    for doc in docs {
        match serde_json::from_value::<SessionAllocation>(doc.data) {
            Ok(allocation) => allocations.push(allocation),
            Err(err) => {
                warn!(allocation_id = %doc.id, %err, "skipping malformed allocation document");
            }
        }
    }
    Ok(allocations)
}

async fn load_hall_config(
    store: &dyn DocumentStore,
    conference_id: &str,
) -> Result<Option<ConferenceHallConfig>, LifecycleError> {
    let Some(doc) =
        find_config_by_conference_id(store, Collection::ConferenceHallConfig, conference_id)
            .await?
    else {
        return Ok(None);
    };
    match serde_json::from_value(doc.data) {
        Ok(config) => Ok(Some(config)),
        Err(err) => {
            warn!(config_id = %doc.id, %err, "ignoring malformed conference-hall config");
            Ok(None)
        }
    }
}

fn compute_dashboard(
    conference_id: &str,
    conference: &Conference,
    sessions: &[Session],
    allocations: &[SessionAllocation],
    hall_config: Option<&ConferenceHallConfig>,
    trigger: DashboardTrigger,
    now: DateTime<Utc>,
) -> ConferenceDashboard {
    let allocated_session_ids: BTreeSet<&str> = allocations
        .iter()
        .map(|allocation| allocation.session_id.as_str())
        .filter(|id| !id.is_empty())
        .collect();

    let mut submitted = DashboardCounts::default();
    let mut confirmed = DashboardCounts::default();
    let mut allocated = DashboardCounts::default();
    let mut speakers = DashboardSpeakers::default();
    let mut distinct_speakers: BTreeSet<String> = BTreeSet::new();

    for session in sessions {
        let Some(block) = session.conference.as_ref() else {
            continue;
        };
        let type_key = session.session_type_key();
        if block.status.counts_as_submitted() {
            bump(&mut submitted, &type_key);
        }
        if block.status.counts_as_confirmed() {
            bump(&mut confirmed, &type_key);
        }
        if allocated_session_ids.contains(session.id.as_str()) {
            bump(&mut allocated, &type_key);
        }

        for speaker_id in session.speaker_ids() {
            distinct_speakers.insert(speaker_id.to_string());
        }
        match session.speaker_count() {
            2 => speakers.sessions_with_2_speakers += 1,
            3 => speakers.sessions_with_3_speakers += 1,
            _ => {}
        }
    }
    speakers.total = distinct_speakers.len() as u64;

    let slots = compute_slot_stats(conference, allocations);
    let schedule = compute_schedule(conference, now);

    ConferenceDashboard {
        id: conference_id.to_string(),
        conference_id: conference_id.to_string(),
        schema_version: DASHBOARD_SCHEMA_VERSION,
        trigger,
        computed_at: iso_timestamp(now),
        submitted,
        confirmed,
        allocated,
        speakers,
        slots,
        conference_hall: DashboardConferenceHall {
            last_import_at: hall_config
                .and_then(|config| config.last_communication.clone())
                .unwrap_or_default(),
        },
        schedule,
    }
}

fn bump(counts: &mut DashboardCounts, type_key: &str) {
    counts.total += 1;
    *counts
        .by_session_type_id
        .entry(type_key.to_string())
        .or_insert(0) += 1;
}

fn compute_slot_stats(conference: &Conference, allocations: &[SessionAllocation]) -> DashboardSlots {
    let total: u64 = conference
        .days
        .iter()
        .map(|day| day.slots.len() as u64)
        .sum();
    let allocated_slot_ids: BTreeSet<&str> = allocations
        .iter()
        .map(|allocation| allocation.slot_id.as_str())
        .filter(|id| !id.is_empty())
        .collect();
    let allocated = allocated_slot_ids.len() as u64;
    let ratio = if total == 0 {
        0.0
    } else {
        allocated as f64 / total as f64
    };
    DashboardSlots {
        allocated,
        total,
        ratio,
    }
}

fn compute_schedule(conference: &Conference, now: DateTime<Utc>) -> DashboardSchedule {
    let start_date = conference.start_date().unwrap_or_default();
    let days_before_conference = NaiveDate::parse_from_str(&start_date, "%Y-%m-%d")
        .map(|start| (start - now.date_naive()).num_days())
        .unwrap_or(0);
    DashboardSchedule {
        conference_start_date: start_date,
        days_before_conference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionStatus;
    use crate::memory::MemoryStore;
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        "2024-01-15T03:00:00Z".parse().unwrap()
    }

    fn conference(id: &str, dates: &[&str]) -> serde_json::Value {
        let days: Vec<serde_json::Value> = dates
            .iter()
            .enumerate()
            .map(|(i, date)| {
                json!({"id": format!("d{}", i + 1), "dayIndex": i, "date": date,
                       "slots": [
                           {"id": format!("{id}-sl{i}a"), "roomId": "r1"},
                           {"id": format!("{id}-sl{i}b"), "roomId": "r2"},
                       ]})
            })
            .collect();
        json!({"id": id, "name": format!("Conf {id}"), "edition": 1,
               "organizerEmails": ["orga@example.org"], "days": days})
    }

    fn session(
        id: &str,
        conference_id: &str,
        status: SessionStatus,
        type_id: &str,
        speakers: &[&str],
    ) -> serde_json::Value {
        let mut value = json!({
            "id": id,
            "title": format!("Session {id}"),
            "speaker1Id": speakers.first().copied().unwrap_or(""),
            "conference": {
                "conferenceId": conference_id,
                "status": serde_json::to_value(status).unwrap(),
                "sessionTypeId": type_id,
            },
        });
        if let Some(speaker2) = speakers.get(1) {
            value["speaker2Id"] = json!(speaker2);
        }
        if let Some(speaker3) = speakers.get(2) {
            value["speaker3Id"] = json!(speaker3);
        }
        value
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.put(Collection::Conference, "c1", conference("c1", &["2024-03-01", "2024-03-02"]));
        store.put(
            Collection::Session,
            "s1",
            session("s1", "c1", SessionStatus::Submitted, "talk", &["p1"]),
        );
        store.put(
            Collection::Session,
            "s2",
            session("s2", "c1", SessionStatus::SpeakerConfirmed, "talk", &["p1", "p2"]),
        );
        store.put(
            Collection::Session,
            "s3",
            session("s3", "c1", SessionStatus::Programmed, "workshop", &["p3", "p4", "p5"]),
        );
        store.put(
            Collection::Session,
            "s4",
            session("s4", "c1", SessionStatus::Draft, "talk", &["p6"]),
        );
        store.put(
            Collection::SessionAllocation,
            "al1",
            json!({"conferenceId": "c1", "slotId": "c1-sl0a", "sessionId": "s3"}),
        );
        store.put(
            Collection::ConferenceHallConfig,
            "hall-1",
            json!({"conferenceId": "c1", "lastCommunication": "2024-01-10T08:00:00Z"}),
        );
        store
    }

    async fn conference_doc(store: &MemoryStore, id: &str) -> Document {
        store.get(Collection::Conference, id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn buckets_cross_tabulate_by_session_type() {
        let store = seeded_store();
        let doc = conference_doc(&store, "c1").await;

        let report = recompute_and_persist(&store, &doc, DashboardTrigger::ManualRefresh, now())
            .await
            .unwrap();
        let dashboard = report.dashboard;

        // DRAFT stays out of every bucket.
        assert_eq!(dashboard.submitted.total, 3);
        assert_eq!(
            dashboard.submitted.by_session_type_id,
            BTreeMap::from([("talk".to_string(), 2), ("workshop".to_string(), 1)])
        );
        assert_eq!(dashboard.confirmed.total, 2);
        assert_eq!(dashboard.allocated.total, 1);
        assert_eq!(
            dashboard.allocated.by_session_type_id,
            BTreeMap::from([("workshop".to_string(), 1)])
        );

        assert_eq!(dashboard.speakers.total, 6);
        assert_eq!(dashboard.speakers.sessions_with_2_speakers, 1);
        assert_eq!(dashboard.speakers.sessions_with_3_speakers, 1);

        assert_eq!(dashboard.slots.total, 4);
        assert_eq!(dashboard.slots.allocated, 1);
        assert!((dashboard.slots.ratio - 0.25).abs() < f64::EPSILON);

        assert_eq!(dashboard.conference_hall.last_import_at, "2024-01-10T08:00:00Z");
        assert_eq!(dashboard.schedule.conference_start_date, "2024-03-01");
        assert_eq!(dashboard.schedule.days_before_conference, 46);
    }

    #[tokio::test]
    async fn dashboard_is_overwritten_and_history_appended() {
        let store = seeded_store();
        let doc = conference_doc(&store, "c1").await;

        let first = recompute_and_persist(&store, &doc, DashboardTrigger::ManualRefresh, now())
            .await
            .unwrap();
        let second = recompute_and_persist(&store, &doc, DashboardTrigger::AutoEvent, now())
            .await
            .unwrap();

        assert_ne!(first.history_id, second.history_id);
        // One dashboard document, two immutable history entries.
        assert_eq!(store.count(Collection::ConferenceDashboard), 1);
        assert_eq!(store.count(Collection::ConferenceDashboardHistory), 2);

        let stored = store
            .get(Collection::ConferenceDashboard, "c1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.data["trigger"], "AUTO_EVENT");
        assert_eq!(stored.data["schemaVersion"], 1);
    }

    #[tokio::test]
    async fn sweep_skips_past_conferences_and_isolates_failures() {
        let store = MemoryStore::new();
        // Upcoming, already finished, and malformed conferences.
        store.put(Collection::Conference, "future", conference("future", &["2024-03-01"]));
        store.put(Collection::Conference, "past", conference("past", &["2023-11-01"]));
        store.put(Collection::Conference, "today", conference("today", &["2024-01-15"]));
        store.put(
            Collection::Conference,
            "broken",
            json!({"id": "broken", "name": "Broken", "edition": "not-a-number",
                   "days": [{"dayIndex": 0, "date": "2024-06-01"}]}),
        );

        let totals = run_daily_sweep(&store, now(), Duration::from_secs(540))
            .await
            .unwrap();

        assert_eq!(totals.conferences, 4);
        assert_eq!(totals.processed, 1);
        // "today" is not strictly in the future and counts as skipped.
        assert_eq!(totals.skipped, 2);
        assert_eq!(totals.failed, 1);
        assert!(totals.completed);

        assert!(store
            .get(Collection::ConferenceDashboard, "future")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .get(Collection::ConferenceDashboard, "past")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn exhausted_budget_stops_the_sweep_but_not_the_report() {
        let store = MemoryStore::new();
        store.put(Collection::Conference, "future", conference("future", &["2024-03-01"]));

        let totals = run_daily_sweep(&store, now(), Duration::ZERO).await.unwrap();
        assert!(!totals.completed);
        assert_eq!(totals.processed, 0);
    }
}
