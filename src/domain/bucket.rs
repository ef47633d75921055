//! Token bucket quota accounting.
//!
//! A bucket tracks the call budget of one action with a direct policy. It is
//! pure state: callers pass in the current instant and are responsible for
//! serializing access (the registry keeps each bucket behind a shard lock).

use crate::domain::policy::DirectPolicy;
use std::time::{Duration, Instant};

/// Tolerance for floating point drift when checking for a whole unit.
///
/// Waiting exactly `time_until_available` must always yield a grant, even
/// when `elapsed * rate` lands a hair under 1.0.
const UNIT_EPSILON: f64 = 1e-9;

/// Answer to "how long until one unit is available".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// A unit is available now
    Ready,
    /// A unit will be available after this duration
    After(Duration),
    /// The bucket can never hold a whole unit again
    Never,
}

impl Wait {
    /// Check if a unit is available now.
    pub fn is_ready(&self) -> bool {
        matches!(self, Wait::Ready)
    }
}

/// Mutable quota counter for one direct policy.
///
/// # Example
/// ```
/// use call_throttle::{DirectPolicy, TokenBucket, Wait};
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut bucket = TokenBucket::new(DirectPolicy::new(2.0, 0.5).unwrap(), start);
///
/// assert!(bucket.try_consume(start));
/// assert!(bucket.try_consume(start));
/// assert!(!bucket.try_consume(start));
/// assert_eq!(bucket.time_until_available(start), Wait::After(Duration::from_secs(2)));
///
/// assert!(bucket.try_consume(start + Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket {
    policy: DirectPolicy,
    capacity: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(policy: DirectPolicy, now: Instant) -> Self {
        Self {
            policy,
            capacity: policy.burst_capacity(),
            last_refill: now,
        }
    }

    /// Add capacity for the time elapsed since the last refill.
    ///
    /// An instant earlier than the last refill adds nothing and does not move
    /// the refill timestamp backwards, so concurrent callers that sampled the
    /// clock before acquiring the bucket cannot double count elapsed time.
    pub fn refill(&mut self, now: Instant) {
        if now <= self.last_refill {
            return;
        }
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        let restored = elapsed * self.policy.restore_rate_per_second();
        self.capacity = (self.capacity + restored).min(self.policy.burst_capacity());
        self.last_refill = now;
    }

    /// Consume one unit if available.
    ///
    /// Returns `false` and leaves capacity untouched when less than one unit
    /// is available.
    pub fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.has_unit() {
            self.capacity = (self.capacity - 1.0).max(0.0);
            true
        } else {
            false
        }
    }

    /// Time until one unit is available.
    ///
    /// Returns [`Wait::Never`] when the bucket cannot refill (zero restore
    /// rate) or can never hold a whole unit (burst below one).
    pub fn time_until_available(&mut self, now: Instant) -> Wait {
        self.refill(now);
        if self.has_unit() {
            return Wait::Ready;
        }
        let rate = self.policy.restore_rate_per_second();
        if rate <= 0.0 || self.policy.burst_capacity() + UNIT_EPSILON < 1.0 {
            return Wait::Never;
        }
        let seconds = (1.0 - self.capacity) / rate;
        // Round up so that sleeping for the returned duration always suffices.
        let nanos = (seconds * 1e9).ceil();
        if nanos >= u64::MAX as f64 {
            return Wait::Never;
        }
        Wait::After(Duration::from_nanos(nanos as u64))
    }

    /// Capacity as of the last refill.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// The policy this bucket enforces.
    pub fn policy(&self) -> &DirectPolicy {
        &self.policy
    }

    fn has_unit(&self) -> bool {
        self.capacity + UNIT_EPSILON >= 1.0
    }
}
