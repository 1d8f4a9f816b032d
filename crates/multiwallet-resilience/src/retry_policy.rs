//! Reconnect scheduling policy
//!
//! Two delay tiers only: a quick first retry, then a flat slower cadence
//! until the attempt budget runs out.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect attempts before a chain is marked unstable
pub const MAX_RETRY: u32 = 6;

/// Delay before the first reconnect attempt
pub const FIRST_RECONNECT_DELAY: Duration = Duration::from_millis(3_000);

/// Delay before every later attempt
pub const SHORT_RETRY_DELAY: Duration = Duration::from_millis(20_000);

/// Serde adapter for `Duration` as integer milliseconds
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Attempt budget and delay tiers for automatic reconnects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Attempts before giving up and marking the chain unstable
    pub max_retry: u32,
    /// Delay before the first attempt
    #[serde(rename = "first_reconnect_delay_ms", with = "duration_millis")]
    pub first_reconnect_delay: Duration,
    /// Delay before each later attempt
    #[serde(rename = "short_retry_delay_ms", with = "duration_millis")]
    pub short_retry_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retry: MAX_RETRY,
            first_reconnect_delay: FIRST_RECONNECT_DELAY,
            short_retry_delay: SHORT_RETRY_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// Create new policy with the default tiers
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Set the first-attempt delay
    pub fn with_first_reconnect_delay(mut self, delay: Duration) -> Self {
        self.first_reconnect_delay = delay;
        self
    }

    /// Set the later-attempt delay
    pub fn with_short_retry_delay(mut self, delay: Duration) -> Self {
        self.short_retry_delay = delay;
        self
    }

    /// Delay before the attempt following `retry_times` earlier ones
    pub fn delay_for(&self, retry_times: u32) -> Duration {
        if retry_times == 0 {
            self.first_reconnect_delay
        } else {
            self.short_retry_delay
        }
    }

    /// True once `retry_times` attempts have used up the budget
    pub fn is_exhausted(&self, retry_times: u32) -> bool {
        retry_times >= self.max_retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_tiers_only() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(3000));
        for n in 1..10 {
            assert_eq!(policy.delay_for(n), Duration::from_millis(20000));
        }
    }

    #[test]
    fn test_budget() {
        let policy = ReconnectPolicy::default();
        assert!(!policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
        assert!(ReconnectPolicy::new().with_max_retry(2).is_exhausted(2));
    }

    #[test]
    fn test_json_uses_millis() {
        let policy: ReconnectPolicy =
            serde_json::from_str(r#"{"max_retry": 3, "short_retry_delay_ms": 500}"#).unwrap();
        assert_eq!(policy.max_retry, 3);
        assert_eq!(policy.first_reconnect_delay, FIRST_RECONNECT_DELAY);
        assert_eq!(policy.short_retry_delay, Duration::from_millis(500));

        let json = serde_json::to_value(ReconnectPolicy::default()).unwrap();
        assert_eq!(json["first_reconnect_delay_ms"], 3000);
    }
}
