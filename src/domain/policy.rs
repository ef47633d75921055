//! Rate limit policies for remote actions.
//!
//! Every action is governed by exactly one policy: either a direct policy
//! that owns a token bucket, or an alias that borrows another action's
//! bucket. Aliases exist for paginated continuation calls, which the remote
//! service counts against the quota of the call they continue.

use crate::domain::action::ActionName;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a direct policy has out-of-range parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// Burst capacity must be finite and non-negative
    #[error("burst capacity must be finite and >= 0, got {0}")]
    InvalidBurstCapacity(f64),
    /// Restore rate must be finite and non-negative
    #[error("restore rate must be finite and >= 0, got {0}")]
    InvalidRestoreRate(f64),
}

/// A policy that owns its own bucket.
///
/// The bucket starts full at `burst_capacity` and regains
/// `restore_rate_per_second` units per second, never exceeding the burst.
///
/// # Example
/// ```
/// use call_throttle::DirectPolicy;
///
/// let policy = DirectPolicy::new(6.0, 0.015).unwrap();
/// assert_eq!(policy.burst_capacity(), 6.0);
///
/// assert!(DirectPolicy::new(-1.0, 0.5).is_err());
/// assert!(DirectPolicy::new(6.0, f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectPolicy {
    burst_capacity: f64,
    restore_rate_per_second: f64,
}

impl DirectPolicy {
    /// Create a direct policy.
    ///
    /// # Errors
    /// Returns `PolicyError` if either parameter is negative, NaN or infinite.
    pub fn new(burst_capacity: f64, restore_rate_per_second: f64) -> Result<Self, PolicyError> {
        if !burst_capacity.is_finite() || burst_capacity < 0.0 {
            return Err(PolicyError::InvalidBurstCapacity(burst_capacity));
        }
        if !restore_rate_per_second.is_finite() || restore_rate_per_second < 0.0 {
            return Err(PolicyError::InvalidRestoreRate(restore_rate_per_second));
        }
        Ok(Self {
            burst_capacity,
            restore_rate_per_second,
        })
    }

    /// Maximum number of calls available with no wait.
    pub fn burst_capacity(&self) -> f64 {
        self.burst_capacity
    }

    /// Units of capacity regained per second.
    pub fn restore_rate_per_second(&self) -> f64 {
        self.restore_rate_per_second
    }
}

/// A policy with no quota of its own.
///
/// All consumption is redirected to the bucket owned by `alias_of`, which
/// must be governed by a [`DirectPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasPolicy {
    alias_of: ActionName,
}

impl AliasPolicy {
    /// Create an alias of `target`.
    pub fn new(target: impl Into<ActionName>) -> Self {
        Self {
            alias_of: target.into(),
        }
    }

    /// The action whose bucket this alias shares.
    pub fn alias_of(&self) -> &ActionName {
        &self.alias_of
    }
}

/// Policy governing one action.
#[derive(Debug, Clone, PartialEq)]
pub enum RatePolicy {
    /// Owns a token bucket
    Direct(DirectPolicy),
    /// Shares another action's bucket
    Alias(AliasPolicy),
}

impl RatePolicy {
    /// Create a direct policy.
    ///
    /// # Errors
    /// See [`DirectPolicy::new`].
    pub fn direct(burst_capacity: f64, restore_rate_per_second: f64) -> Result<Self, PolicyError> {
        DirectPolicy::new(burst_capacity, restore_rate_per_second).map(RatePolicy::Direct)
    }

    /// Create an alias policy.
    pub fn alias(target: impl Into<ActionName>) -> Self {
        RatePolicy::Alias(AliasPolicy::new(target))
    }

    /// Check if this policy owns a bucket.
    pub fn is_direct(&self) -> bool {
        matches!(self, RatePolicy::Direct(_))
    }

    /// The alias target, if this is an alias.
    pub fn alias_target(&self) -> Option<&ActionName> {
        match self {
            RatePolicy::Direct(_) => None,
            RatePolicy::Alias(alias) => Some(alias.alias_of()),
        }
    }
}

impl fmt::Display for RatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatePolicy::Direct(p) => write!(
                f,
                "burst={} restore={}/s",
                p.burst_capacity, p.restore_rate_per_second
            ),
            RatePolicy::Alias(a) => write!(f, "alias of {}", a.alias_of),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_policy_accepts_zero() {
        let policy = DirectPolicy::new(0.0, 0.0).unwrap();
        assert_eq!(policy.burst_capacity(), 0.0);
        assert_eq!(policy.restore_rate_per_second(), 0.0);
    }

    #[test]
    fn test_direct_policy_rejects_bad_values() {
        assert_eq!(
            DirectPolicy::new(-0.5, 1.0),
            Err(PolicyError::InvalidBurstCapacity(-0.5))
        );
        assert_eq!(
            DirectPolicy::new(1.0, -2.0),
            Err(PolicyError::InvalidRestoreRate(-2.0))
        );
        assert!(DirectPolicy::new(f64::INFINITY, 1.0).is_err());
        assert!(DirectPolicy::new(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_alias_target() {
        let policy = RatePolicy::alias("listOrders");
        assert!(!policy.is_direct());
        assert_eq!(policy.alias_target().map(|a| a.as_str()), Some("listOrders"));

        let direct = RatePolicy::direct(6.0, 0.015).unwrap();
        assert!(direct.is_direct());
        assert!(direct.alias_target().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            RatePolicy::direct(30.0, 0.5).unwrap().to_string(),
            "burst=30 restore=0.5/s"
        );
        assert_eq!(RatePolicy::alias("listOrders").to_string(), "alias of listOrders");
    }
}
