//! crates/conference_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Persisted documents are camelCase JSON; every persistent struct carries a
//! flattened `extra` map so fields this core does not interpret survive a
//! read-modify-write cycle unchanged (Duplicate clones source documents
//! verbatim apart from the fields it overwrites).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default day boundaries applied when a duplicated day has no template times.
pub const DEFAULT_DAY_BEGIN_TIME: &str = "09:00";
pub const DEFAULT_DAY_END_TIME: &str = "18:00";

/// Session-type key used in dashboard cross-tabulations when a session has no
/// usable session-type id. The management UI renders this key as a dedicated
/// "unknown" column.
pub const UNKNOWN_SESSION_TYPE_KEY: &str = "__unknown__";

//=========================================================================================
// Conference aggregate
//=========================================================================================

/// Root aggregate: one edition of an event, owning its days/rooms/tracks
/// configuration. `(name, edition)` is unique across all conferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub edition: i64,
    #[serde(default)]
    pub organizer_emails: Vec<String>,
    /// Ordered by `dayIndex`, contiguous from 0.
    #[serde(default)]
    pub days: Vec<ConferenceDay>,
    #[serde(default)]
    pub rooms: Vec<Value>,
    #[serde(default)]
    pub tracks: Vec<Value>,
    #[serde(default)]
    pub session_types: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsoring: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Conference {
    /// Earliest calendar date among the conference days, in `YYYY-MM-DD`.
    /// `None` when the conference has no day with a well-formed date.
    pub fn start_date(&self) -> Option<String> {
        self.days
            .iter()
            .map(|day| day.date.trim().to_string())
            .filter(|date| chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok())
            .min()
    }

    pub fn is_organizer(&self, email: &str) -> bool {
        self.organizer_emails
            .iter()
            .any(|organizer| organizer.eq_ignore_ascii_case(email))
    }
}

/// One calendar day of a conference. `dayIndex` defines ordering independent
/// of the calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceDay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub day_index: i64,
    /// Calendar date in `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub disabled_room_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A planning slot within a day, anchored to one primary room.
/// `overflowRoomIds` mirrors the same content into additional rooms and never
/// contains the primary `roomId`; duplicate entries carry no meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overflow_room_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

//=========================================================================================
// Sessions and the status machine
//=========================================================================================

/// Lifecycle status of a session within one conference.
///
/// Transition table (consumed, not owned, by this core):
/// `DRAFT→SUBMITTED→{REJECTED, ACCEPTED, WAITLISTED}`,
/// `WAITLISTED→{REJECTED, ACCEPTED}`, `ACCEPTED→SPEAKER_CONFIRMED`,
/// `SCHEDULED→{DECLINED_BY_SPEAKER, PROGRAMMED}`, `PROGRAMMED→CANCELLED`.
/// Entry into `SCHEDULED`/`PROGRAMMED` is driven by the external planning
/// workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Draft,
    Submitted,
    Rejected,
    Accepted,
    Waitlisted,
    SpeakerConfirmed,
    Scheduled,
    DeclinedBySpeaker,
    Programmed,
    Cancelled,
}

impl SessionStatus {
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match self {
            Draft => matches!(next, Submitted),
            Submitted => matches!(next, Rejected | Accepted | Waitlisted),
            Waitlisted => matches!(next, Rejected | Accepted),
            Accepted => matches!(next, SpeakerConfirmed),
            Scheduled => matches!(next, DeclinedBySpeaker | Programmed),
            Programmed => matches!(next, Cancelled),
            Rejected | SpeakerConfirmed | DeclinedBySpeaker | Cancelled => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        use SessionStatus::*;
        matches!(self, Rejected | SpeakerConfirmed | DeclinedBySpeaker | Cancelled)
    }

    /// Whether the session counts toward the dashboard `submitted` bucket:
    /// everything that ever left DRAFT.
    pub fn counts_as_submitted(self) -> bool {
        !matches!(self, SessionStatus::Draft)
    }

    /// Whether the session counts toward the dashboard `confirmed` bucket:
    /// speaker-confirmed and the planning stages built on top of it.
    pub fn counts_as_confirmed(self) -> bool {
        use SessionStatus::*;
        matches!(self, SpeakerConfirmed | Scheduled | Programmed)
    }
}

/// A talk/workshop. Most fields are speaker-owned; the nested `conference`
/// block carries the conference-scoped state this core reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub speaker1_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker2_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker3_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference: Option<SessionConference>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    pub fn speaker_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.speaker1_id.as_str())
            .chain(self.speaker2_id.as_deref())
            .chain(self.speaker3_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    pub fn speaker_count(&self) -> usize {
        self.speaker_ids().count()
    }

    /// Dashboard column key for this session.
    pub fn session_type_key(&self) -> String {
        let key = self
            .conference
            .as_ref()
            .map(|conference| conference.session_type_id.trim())
            .unwrap_or("");
        if key.is_empty() {
            UNKNOWN_SESSION_TYPE_KEY.to_string()
        } else {
            key.to_string()
        }
    }
}

/// Conference-scoped block of a submitted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConference {
    #[serde(default)]
    pub conference_id: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub session_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

//=========================================================================================
// People
//=========================================================================================

/// A globally shared human identity. A person created solely to represent a
/// speaker submission to one conference, never promoted to an account, is a
/// deletion candidate for that conference's teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub has_account: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<PersonSpeaker>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSpeaker {
    /// Every conference this person has ever submitted to.
    #[serde(default)]
    pub submitted_conference_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

//=========================================================================================
// Conference-scoped fan-out records
//=========================================================================================

/// A side event (dinner, workshop, ...). Only the fields Duplicate rewrites
/// are typed; everything else rides along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub conference_id: String,
    /// Start date-time, ISO 8601 local string.
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Allocation of a session to a day/slot/room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAllocation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub conference_id: String,
    #[serde(default)]
    pub slot_id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

//=========================================================================================
// Side configs and the platform singleton
//=========================================================================================

/// Conference-Hall import integration settings (1:1 per conference).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceHallConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub conference_id: String,
    /// Timestamp of the last import exchange, ISO 8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_communication: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// External publication settings (Voxxrin-style). Only the fields the
/// descriptor export reads are typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub conference_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_sub_title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The single well-known platform policy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    #[serde(default)]
    pub only_platform_admin_can_create_conference: bool,
    /// Single-conference-mode pointer; empty when the mode is off.
    #[serde(default)]
    pub single_conference_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

//=========================================================================================
// Dashboard read-model
//=========================================================================================

/// What caused a dashboard recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardTrigger {
    ManualRefresh,
    ScheduledDaily,
    AutoEvent,
}

/// A session count with its per-session-type breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub total: u64,
    pub by_session_type_id: std::collections::BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSpeakers {
    pub total: u64,
    pub sessions_with_2_speakers: u64,
    pub sessions_with_3_speakers: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSlots {
    pub allocated: u64,
    pub total: u64,
    pub ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConferenceHall {
    #[serde(default)]
    pub last_import_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSchedule {
    #[serde(default)]
    pub conference_start_date: String,
    pub days_before_conference: i64,
}

/// Derived, fully recomputable statistics snapshot for one conference.
/// Never a source of truth: it can be discarded and rebuilt at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceDashboard {
    pub id: String,
    pub conference_id: String,
    pub schema_version: u32,
    pub trigger: DashboardTrigger,
    /// ISO timestamp of this recompute.
    pub computed_at: String,
    pub submitted: DashboardCounts,
    pub confirmed: DashboardCounts,
    pub allocated: DashboardCounts,
    pub speakers: DashboardSpeakers,
    pub slots: DashboardSlots,
    pub conference_hall: DashboardConferenceHall,
    pub schedule: DashboardSchedule,
}

//=========================================================================================
// Operation inputs and reports
//=========================================================================================

/// Which datasets a duplication carries over from the source conference.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateOptions {
    pub rooms: bool,
    pub tracks: bool,
    pub planning_structure: bool,
    pub activities: bool,
    pub sponsors: bool,
}

/// Validated input of the Duplicate orchestrator.
#[derive(Debug, Clone)]
pub struct DuplicateRequest {
    pub name: String,
    pub edition: i64,
    /// First day of the new conference, `YYYY-MM-DD`.
    pub start_date: String,
    pub options: DuplicateOptions,
}

/// Duplication result returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    /// Identifier of the newly created conference.
    pub conference_id: String,
    pub activities_created: u64,
    pub created_at: String,
}

/// Deletion result: one counter per dependent kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub conference_deleted: u64,
    pub sessions_deleted: u64,
    pub conference_speakers_deleted: u64,
    pub persons_deleted: u64,
    pub activities_deleted: u64,
    pub activity_participations_deleted: u64,
    pub session_allocations_deleted: u64,
    pub conference_hall_configs_deleted: u64,
    pub publication_configs_deleted: u64,
    pub conference_secrets_deleted: u64,
    pub dashboards_deleted: u64,
    #[serde(default)]
    pub deleted_at: String,
}

/// Result of one dashboard recompute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub history_id: String,
    pub dashboard: ConferenceDashboard,
}

/// Timestamp rendering shared by all reports: ISO 8601 with second precision.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
