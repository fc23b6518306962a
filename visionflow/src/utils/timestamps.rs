//! Timestamp and run identifier helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// UTC timestamp used throughout the crate.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an RFC 3339 string with microseconds.
#[must_use]
pub fn iso_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Formats `ts` as RFC 3339 with microseconds and a `Z` suffix.
#[must_use]
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Generates a time-ordered (v7) run identifier.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01T12:30:05.000000Z");
    }

    #[test]
    fn test_iso_timestamp_shape() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_run_ids_are_v7_and_unique() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert_eq!(a.get_version_num(), 7);
        assert_ne!(a, b);
    }
}
