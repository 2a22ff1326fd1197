//! Timestamp utilities
//!
//! All persisted timestamps are UTC RFC 3339 strings so that lexical order
//! matches chronological order in SQLite comparisons.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time formatted for storage
pub fn now_db() -> String {
    to_db(now())
}

/// Midnight (UTC) of the day containing `ts`
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    let date = ts.date_naive();
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Current Unix time in milliseconds
pub fn now_millis() -> i64 {
    now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_db_format_sorts_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert!(to_db(earlier) < to_db(later));
        assert!(to_db(later).ends_with('Z'));
    }

    #[test]
    fn test_start_of_day_truncates_time() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 10, 17, 45, 12).unwrap();
        let midnight = start_of_day(ts);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_start_of_day_is_idempotent() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(start_of_day(midnight), midnight);
    }
}
