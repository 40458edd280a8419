//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parses an RFC 3339 / ISO-8601 string, normalizing any offset to UTC.
    pub fn parse_rfc3339(field: &str, value: &str) -> Result<Self, ValidationError> {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| ValidationError::invalid_format(field, e.to_string()))
    }

    /// Last representable millisecond of a calendar day (23:59:59.999 UTC).
    ///
    /// Event dates and cash deadlines are day-granular; they stay open
    /// until the very end of that day.
    pub fn end_of_day(date: NaiveDate) -> Self {
        let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        Self(date.and_time(end).and_utc())
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by adding the specified number of days.
    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Creates a new timestamp by adding the specified number of minutes.
    pub fn plus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 + Duration::minutes(minutes))
    }

    /// Returns the earlier of two timestamps.
    pub fn earliest(self, other: Timestamp) -> Self {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339("test", s).unwrap()
    }

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let now = Timestamp::now();
        let after = Utc::now();

        assert!(now.as_datetime() >= &before);
        assert!(now.as_datetime() <= &after);
    }

    #[test]
    fn parse_rfc3339_normalizes_offsets_to_utc() {
        let parsed = ts("2025-06-01T12:00:00+02:00");
        assert_eq!(parsed.as_datetime().hour(), 10);
    }

    #[test]
    fn parse_rfc3339_rejects_garbage() {
        let err = Timestamp::parse_rfc3339("receivedAt", "yesterday").unwrap_err();
        assert!(err.to_string().contains("receivedAt"));
    }

    #[test]
    fn end_of_day_is_last_millisecond() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 14).unwrap();
        let end = Timestamp::end_of_day(date);
        assert_eq!(end, ts("2025-09-14T23:59:59.999Z"));
        assert_eq!(end.as_datetime().day(), 14);
    }

    #[test]
    fn plus_minutes_and_days_add_correctly() {
        let start = ts("2025-01-01T00:00:00Z");
        assert_eq!(start.plus_minutes(15), ts("2025-01-01T00:15:00Z"));
        assert_eq!(start.plus_days(2), ts("2025-01-03T00:00:00Z"));
    }

    #[test]
    fn earliest_picks_smaller_value() {
        let a = ts("2025-01-01T00:00:00Z");
        let b = ts("2025-01-02T00:00:00Z");
        assert_eq!(a.earliest(b), a);
        assert_eq!(b.earliest(a), a);
    }

    #[test]
    fn timestamp_serializes_to_json() {
        let json = serde_json::to_string(&ts("2024-01-15T10:30:00Z")).unwrap();
        assert!(json.contains("2024-01-15"));
    }
}
