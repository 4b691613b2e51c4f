//! crates/conference_core/src/dates.rs
//!
//! Pure date arithmetic for cloning calendar-bound content to a new start
//! date. No I/O; callers decide what to log.

use chrono::NaiveDate;

/// Outcome of shifting the date prefix of a local date-time string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShiftedDateTime {
    Shifted(String),
    /// The input did not carry a `YYYY-MM-DD` prefix; the caller keeps the
    /// original value and logs the skip.
    Unrecognized,
}

/// Whole-day difference between two calendar dates (date-only, no time).
pub fn compute_day_offset(target_start_date: NaiveDate, source_start_date: NaiveDate) -> i64 {
    (target_start_date - source_start_date).num_days()
}

/// Parses the `YYYY-MM-DD` prefix of a date or date-time string.
pub fn parse_date_prefix(value: &str) -> Option<NaiveDate> {
    let prefix = value.get(0..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Shifts only the calendar-date portion of `value` by `day_offset` days.
/// The remainder of the string (time-of-day, fractional seconds, zone
/// marker) is copied verbatim, byte for byte.
pub fn shift_calendar_date(value: &str, day_offset: i64) -> ShiftedDateTime {
    let Some(date) = parse_date_prefix(value) else {
        return ShiftedDateTime::Unrecognized;
    };
    if day_offset == 0 {
        return ShiftedDateTime::Shifted(value.to_string());
    }
    let Some(shifted) = date.checked_add_signed(chrono::Duration::days(day_offset)) else {
        return ShiftedDateTime::Unrecognized;
    };
    let suffix = &value[10..];
    ShiftedDateTime::Shifted(format!("{}{}", shifted.format("%Y-%m-%d"), suffix))
}
