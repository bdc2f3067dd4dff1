//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
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

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// True when more than `age` has passed between this timestamp and `now`.
    pub fn is_older_than(&self, age: Duration, now: &Timestamp) -> bool {
        match chrono::Duration::from_std(age) {
            Ok(age) => now.0.signed_duration_since(self.0) > age,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_than_compares_against_reference_point() {
        let then = Timestamp::now();
        let later = Timestamp::from_datetime(*then.as_datetime() + chrono::Duration::seconds(90));

        assert!(then.is_older_than(Duration::from_secs(60), &later));
        assert!(!then.is_older_than(Duration::from_secs(120), &later));
    }

    #[test]
    fn timestamps_are_ordered() {
        let a = Timestamp::now();
        let b = Timestamp::from_datetime(*a.as_datetime() + chrono::Duration::milliseconds(1));
        assert!(a < b);
    }
}
