//! Second-resolution timestamp in the `{seconds, nanoseconds}` shape stored on
//! review documents.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A point in time as stored on review documents.
///
/// Ordering compares seconds first, then nanoseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: i32,
}

impl Timestamp {
    #[must_use]
    pub const fn new(seconds: i64, nanoseconds: i32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Current time truncated to whole seconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Truncate a `DateTime` to whole seconds.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::new(dt.timestamp(), 0)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.seconds * 1000 + i64::from(self.nanoseconds / 1_000_000)
    }

    /// Convert to a `DateTime`, or `None` if out of range.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(self.nanoseconds).ok()?;
        Utc.timestamp_opt(self.seconds, nanos).single()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_now_has_zero_nanoseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.nanoseconds, 0);
        assert!(ts.seconds > 1_700_000_000);
    }

    #[test]
    fn test_ordering() {
        let a = Timestamp::new(100, 0);
        let b = Timestamp::new(100, 5);
        let c = Timestamp::new(101, 0);
        assert!(a < b);
        assert!(b < c);
        assert!(Timestamp::default() < a);
    }

    #[test]
    fn test_as_millis() {
        assert_eq!(Timestamp::new(2, 500_000_000).as_millis(), 2500);
    }

    #[test]
    fn test_to_datetime() {
        let dt = Timestamp::new(1_700_000_000, 0).to_datetime().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert!(Timestamp::new(0, -1).to_datetime().is_none());
    }

    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_value(Timestamp::new(5, 0)).unwrap();
        assert_eq!(json, serde_json::json!({"seconds": 5, "nanoseconds": 0}));
    }
}
