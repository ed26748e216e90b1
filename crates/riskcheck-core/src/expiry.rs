//! Re-evaluation reminders
//!
//! Age is measured in calendar days between UTC dates, not in elapsed hours, so
//! a daylight-saving shift or an early-morning check never moves the result by
//! a day.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Days after which an assessment should be redone
pub const REEVALUATE_AFTER_DAYS: i64 = 30;

/// Parse a backend timestamp into a UTC calendar date
///
/// Accepts RFC 3339, naive ISO datetimes (read as UTC) and bare dates.
#[must_use]
pub fn parse_utc_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Whole calendar days from `created_at` to `now`
#[must_use]
pub fn calendar_days_since(created_at: &str, now: DateTime<Utc>) -> Option<i64> {
    let created = parse_utc_date(created_at)?;
    Some((now.date_naive() - created).num_days())
}

/// Whether an assessment created at `created_at` is due for re-evaluation
///
/// Missing or malformed timestamps are never expired.
#[must_use]
pub fn is_expired(created_at: Option<&str>, now: DateTime<Utc>, threshold_days: i64) -> bool {
    let Some(raw) = created_at else {
        return false;
    };
    match calendar_days_since(raw, now) {
        Some(days) => days >= threshold_days,
        None => {
            tracing::warn!("Failed to parse created_at: {raw}");
            false
        }
    }
}

/// Long-form date for display, e.g. "January 5, 2024"
#[must_use]
pub fn display_date(created_at: Option<&str>) -> String {
    match created_at {
        None => "unknown date".to_string(),
        Some(raw) => match parse_utc_date(raw) {
            Some(date) => date.format("%B %-d, %Y").to_string(),
            None => raw.to_string(),
        },
    }
}
