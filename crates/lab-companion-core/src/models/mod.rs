//! Domain models for the lab companion.

mod catalog;
mod patient;
mod report;
mod result;

pub use catalog::*;
pub use patient::*;
pub use report::*;
pub use result::*;

use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp in the canonical stored form.
///
/// Fixed microsecond precision with a `Z` suffix keeps lexical order equal to
/// chronological order, which the history queries rely on.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time in the canonical stored form.
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_chronologically() {
        let early = format_timestamp(Utc.with_ymd_and_hms(2024, 1, 9, 8, 0, 0).unwrap());
        let late = format_timestamp(Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap());
        assert!(early < late);
        assert_eq!(early, "2024-01-09T08:00:00.000000Z");
    }
}
