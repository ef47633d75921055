//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Manually driven clock.
///
/// Lets bucket and registry tests move time forward explicitly instead of
/// sleeping. Clones share the same underlying instant.
///
/// # Examples
///
/// ```
/// use call_throttle::infrastructure::mocks::MockClock;
/// use call_throttle::application::ports::Clock;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
/// let shared = clock.clone();
///
/// shared.advance(Duration::from_secs(66));
/// assert_eq!(clock.now(), start + Duration::from_secs(66));
/// assert_eq!(clock.elapsed(), Duration::from_secs(66));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time += duration;
    }

    /// Time advanced since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.start)
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{bucket::TokenBucket, policy::DirectPolicy};

    #[test]
    fn test_mock_clock_drives_bucket() {
        let clock = MockClock::new(Instant::now());
        let mut bucket = TokenBucket::new(DirectPolicy::new(1.0, 0.25).unwrap(), clock.now());

        assert!(bucket.try_consume(clock.now()));
        clock.advance(Duration::from_secs(3));
        assert!(!bucket.try_consume(clock.now()));
        clock.advance(Duration::from_secs(1));
        assert!(bucket.try_consume(clock.now()));
        assert_eq!(clock.elapsed(), Duration::from_secs(4));
    }
}
