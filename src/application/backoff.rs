//! Backoff schedule for remote throttling rejections.
//!
//! ```text
//! delay(n) = min(base_delay * 2^n, max_delay)
//!
//! With the defaults (1s base, 60s cap, 5 retries):
//! - rejection 1 -> wait 1s
//! - rejection 2 -> wait 2s
//! - rejection 3 -> wait 4s
//! - rejection 4 -> wait 8s
//! - rejection 5 -> wait 16s
//! - rejection 6 -> ThrottleExhausted
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Default upper bound on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
/// Default number of retries after remote throttling.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Bounded exponential backoff applied after remote throttling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the first retry
    #[serde(rename = "base_delay_ms", with = "millis")]
    pub base_delay: Duration,
    /// Upper bound on any single delay
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
    /// Retries allowed after the first rejected call
    pub max_retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl BackoffConfig {
    /// Create a backoff configuration.
    pub fn new(base_delay: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_retries,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Reads `CALL_THROTTLE_BACKOFF_BASE_MS`, `CALL_THROTTLE_BACKOFF_MAX_MS`
    /// and `CALL_THROTTLE_MAX_RETRIES`; unset or unparsable values keep the
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = env_u64("CALL_THROTTLE_BACKOFF_BASE_MS") {
            config.base_delay = Duration::from_millis(ms);
        }

        if let Some(ms) = env_u64("CALL_THROTTLE_BACKOFF_MAX_MS") {
            config.max_delay = Duration::from_millis(ms);
        }

        if let Some(retries) = env_u64("CALL_THROTTLE_MAX_RETRIES") {
            config.max_retries = u32::try_from(retries).unwrap_or(u32::MAX);
        }

        config
    }

    /// Delay before retrying after the `attempt`-th rejection (0-indexed).
    ///
    /// Non-decreasing in `attempt` and never above `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .min(self.max_delay)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable backoff setting");
            None
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let config = BackoffConfig::default();
        let delays: Vec<u64> = (0..8).map(|n| config.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn test_delay_is_monotonic_and_capped() {
        let config = BackoffConfig::new(Duration::from_millis(150), Duration::from_secs(5), 3);
        let mut previous = Duration::ZERO;
        for attempt in 0..64 {
            let delay = config.delay_for(attempt);
            assert!(delay >= previous, "attempt {} went backwards", attempt);
            assert!(delay <= Duration::from_secs(5));
            previous = delay;
        }
        assert_eq!(config.delay_for(200), Duration::from_secs(5));
    }

    #[test]
    fn test_serde_uses_milliseconds() {
        let config: BackoffConfig =
            serde_json::from_str(r#"{"base_delay_ms": 250, "max_retries": 2}"#).unwrap();
        assert_eq!(config.base_delay, Duration::from_millis(250));
        assert_eq!(config.max_delay, DEFAULT_MAX_DELAY);
        assert_eq!(config.max_retries, 2);

        let json = serde_json::to_value(config).unwrap();
        assert_eq!(json["max_delay_ms"], 60_000);
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("CALL_THROTTLE_BACKOFF_BASE_MS", "20");
        std::env::set_var("CALL_THROTTLE_MAX_RETRIES", "not-a-number");
        let config = BackoffConfig::from_env();
        std::env::remove_var("CALL_THROTTLE_BACKOFF_BASE_MS");
        std::env::remove_var("CALL_THROTTLE_MAX_RETRIES");

        assert_eq!(config.base_delay, Duration::from_millis(20));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }
}
