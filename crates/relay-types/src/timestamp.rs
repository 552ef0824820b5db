//! Millisecond Unix timestamp used throughout intent lifecycle records.
//!
//! Mirrors the second-resolution `UnixTimestamp` pattern used elsewhere in this
//! workspace's ancestry, but at millisecond resolution: every field the relay
//! exchanges with the browser collaborator (`timestamp_ms`, `expiry_ms`,
//! `processed_at`, …) is JS `Date.now()`-shaped, not seconds.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
///
/// Serialized as a JSON number (not a string): unlike the payment-authorization
/// windows this pattern originates from, intent timestamps are always well
/// within `f64`'s safe integer range for decades to come, and the wire
/// protocol here is JSON numbers, matching the browser collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnixTimestampMs(u64);

impl Serialize for UnixTimestampMs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for UnixTimestampMs {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(UnixTimestampMs(ms))
    }
}

impl Display for UnixTimestampMs {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestampMs {
    type Output = Self;
    fn add(self, rhs: u64) -> Self::Output {
        UnixTimestampMs(self.0 + rhs)
    }
}

impl Sub for UnixTimestampMs {
    type Output = i64;
    fn sub(self, rhs: Self) -> i64 {
        self.0 as i64 - rhs.0 as i64
    }
}

impl UnixTimestampMs {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Current wall-clock time. Panics if the system clock precedes the epoch.
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as u64;
        Self(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let ts = UnixTimestampMs::from_millis(1_700_000_000_000);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "1700000000000");
        let back: UnixTimestampMs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(UnixTimestampMs::now().as_millis() > 1_577_836_800_000);
    }
}
