//! Rate policy registry and bucket ownership.
//!
//! The registry maps every action to its policy and owns one token bucket
//! per direct policy. It is built once from an ordered list of entries and
//! is immutable afterwards: buckets are mutated in place but never added,
//! removed or replaced.

use crate::application::error::ConfigError;
use crate::application::ports::{Clock, Storage};
use crate::domain::{
    action::ActionName,
    bucket::{TokenBucket, Wait},
    policy::RatePolicy,
};
use crate::infrastructure::storage::ShardedStorage;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of an atomic admission attempt against one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// One unit was consumed
    Granted,
    /// Nothing was consumed; a unit will be available after this duration
    RetryAfter(Duration),
    /// Nothing was consumed and the bucket can never grant again
    Exhausted,
}

/// Point-in-time view of one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSnapshot {
    /// Action owning the bucket
    pub action: ActionName,
    /// Capacity refilled to the instant of the snapshot
    pub capacity: f64,
    /// Maximum capacity
    pub burst_capacity: f64,
    /// Units regained per second
    pub restore_rate_per_second: f64,
}

/// Collects policy entries in registration order.
///
/// Later entries for the same action replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistryBuilder {
    entries: Vec<(ActionName, RatePolicy)>,
}

impl PolicyRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy for an action.
    pub fn register(mut self, action: impl Into<ActionName>, policy: RatePolicy) -> Self {
        self.entries.push((action.into(), policy));
        self
    }

    /// Register several entries in order.
    pub fn register_all<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (ActionName, RatePolicy)>,
    {
        self.entries.extend(entries);
        self
    }

    /// Validate the entries and create the registry with default storage.
    ///
    /// # Errors
    /// Returns `ConfigError` for dangling or chained aliases.
    pub fn build(self, clock: Arc<dyn Clock>) -> Result<PolicyRegistry, ConfigError> {
        PolicyRegistry::with_storage(self.entries, ShardedStorage::new(), clock)
    }
}

/// Registry of rate policies and their buckets.
///
/// Generic over the storage port; production code uses the default
/// `ShardedStorage`.
#[derive(Debug)]
pub struct PolicyRegistry<S = ShardedStorage<ActionName, TokenBucket>>
where
    S: Storage<ActionName, TokenBucket>,
{
    policies: HashMap<ActionName, RatePolicy, ahash::RandomState>,
    buckets: S,
    clock: Arc<dyn Clock>,
}

impl PolicyRegistry {
    /// Start building a registry.
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::new()
    }

    /// Create a registry with default storage from ordered entries.
    ///
    /// # Errors
    /// Returns `ConfigError` for dangling or chained aliases.
    pub fn from_entries<I>(entries: I, clock: Arc<dyn Clock>) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (ActionName, RatePolicy)>,
    {
        Self::with_storage(entries, ShardedStorage::new(), clock)
    }
}

impl<S> PolicyRegistry<S>
where
    S: Storage<ActionName, TokenBucket>,
{
    /// Create a registry backed by the given storage.
    ///
    /// Entries are applied in order with last-write-wins semantics. Every
    /// override is logged; an override with an identical policy is logged as
    /// redundant. Aliases are validated after all entries are applied, so an
    /// alias may name an action registered after it.
    ///
    /// # Errors
    /// - `ConfigError::DanglingAlias` if an alias target has no policy
    /// - `ConfigError::ChainedAlias` if an alias target is itself an alias
    pub fn with_storage<I>(entries: I, buckets: S, clock: Arc<dyn Clock>) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (ActionName, RatePolicy)>,
    {
        let mut policies: HashMap<ActionName, RatePolicy, ahash::RandomState> = HashMap::default();
        let mut order: Vec<ActionName> = Vec::new();

        for (action, policy) in entries {
            match policies.get(&action) {
                Some(previous) if *previous == policy => {
                    warn!(action = %action, policy = %policy, "redundant duplicate rate policy registration");
                }
                Some(previous) => {
                    warn!(
                        action = %action,
                        previous = %previous,
                        policy = %policy,
                        "rate policy overridden by later registration"
                    );
                }
                None => order.push(action.clone()),
            }
            policies.insert(action, policy);
        }

        for action in &order {
            if let Some(RatePolicy::Alias(alias)) = policies.get(action) {
                match policies.get(alias.alias_of()) {
                    None => {
                        return Err(ConfigError::DanglingAlias {
                            action: action.clone(),
                            target: alias.alias_of().clone(),
                        })
                    }
                    Some(RatePolicy::Alias(_)) => {
                        return Err(ConfigError::ChainedAlias {
                            action: action.clone(),
                            target: alias.alias_of().clone(),
                        })
                    }
                    Some(RatePolicy::Direct(_)) => {}
                }
            }
        }

        let now = clock.now();
        for action in &order {
            if let Some(RatePolicy::Direct(policy)) = policies.get(action) {
                buckets.insert(action.clone(), TokenBucket::new(*policy, now));
            }
        }

        debug!(
            actions = policies.len(),
            buckets = buckets.len(),
            "rate policy registry built"
        );

        Ok(Self {
            policies,
            buckets,
            clock,
        })
    }

    /// Resolve the bucket an action consumes from.
    ///
    /// Follows exactly one alias hop.
    ///
    /// # Errors
    /// - `ConfigError::UnknownAction` if the action has no policy
    /// - `ConfigError::DanglingAlias` / `ConfigError::ChainedAlias` if the
    ///   alias target is not a direct policy
    pub fn resolve(&self, action: &str) -> Result<BucketHandle<'_, S>, ConfigError> {
        let (name, policy) = self
            .policies
            .get_key_value(action)
            .ok_or_else(|| ConfigError::UnknownAction(ActionName::new(action)))?;

        let owner = match policy {
            RatePolicy::Direct(_) => name.clone(),
            RatePolicy::Alias(alias) => match self.policies.get(alias.alias_of()) {
                Some(RatePolicy::Direct(_)) => alias.alias_of().clone(),
                Some(RatePolicy::Alias(_)) => {
                    return Err(ConfigError::ChainedAlias {
                        action: name.clone(),
                        target: alias.alias_of().clone(),
                    })
                }
                None => {
                    return Err(ConfigError::DanglingAlias {
                        action: name.clone(),
                        target: alias.alias_of().clone(),
                    })
                }
            },
        };

        Ok(BucketHandle {
            registry: self,
            owner,
        })
    }

    /// Get the policy in effect for an action.
    pub fn policy(&self, action: &str) -> Option<&RatePolicy> {
        self.policies.get(action)
    }

    /// Get the number of registered actions (aliases included).
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Check if no actions are registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Get the number of distinct buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The clock used for refills.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Snapshot every bucket, sorted by action name.
    ///
    /// Each bucket is refilled to the current instant before it is read.
    pub fn snapshot(&self) -> Vec<BucketSnapshot> {
        let mut snapshots = Vec::with_capacity(self.buckets.len());
        self.buckets.for_each_mut(|action, bucket| {
            bucket.refill(self.clock.now());
            snapshots.push(BucketSnapshot {
                action: action.clone(),
                capacity: bucket.capacity(),
                burst_capacity: bucket.policy().burst_capacity(),
                restore_rate_per_second: bucket.policy().restore_rate_per_second(),
            });
        });
        snapshots.sort_by(|a, b| a.action.cmp(&b.action));
        snapshots
    }
}

/// Reference to the bucket an action resolved to.
///
/// Every operation samples the clock while holding the bucket, so callers
/// racing on one bucket see serialized, monotonic refills.
#[derive(Debug)]
pub struct BucketHandle<'a, S>
where
    S: Storage<ActionName, TokenBucket>,
{
    registry: &'a PolicyRegistry<S>,
    owner: ActionName,
}

impl<S> BucketHandle<'_, S>
where
    S: Storage<ActionName, TokenBucket>,
{
    /// The action owning the bucket (the alias target for aliases).
    pub fn owner(&self) -> &ActionName {
        &self.owner
    }

    /// Consume one unit if available.
    pub fn try_consume(&self) -> bool {
        let clock = &self.registry.clock;
        self.registry
            .buckets
            .with_entry_mut(&self.owner, |bucket| bucket.try_consume(clock.now()))
            .unwrap_or(false)
    }

    /// Time until one unit is available.
    pub fn time_until_available(&self) -> Wait {
        let clock = &self.registry.clock;
        self.registry
            .buckets
            .with_entry_mut(&self.owner, |bucket| bucket.time_until_available(clock.now()))
            .unwrap_or(Wait::Never)
    }

    /// Consume one unit, or report how long until one is available.
    ///
    /// Both steps happen under a single acquisition of the bucket.
    pub fn try_acquire(&self) -> Admission {
        let clock = &self.registry.clock;
        self.registry
            .buckets
            .with_entry_mut(&self.owner, |bucket| {
                let now = clock.now();
                if bucket.try_consume(now) {
                    return Admission::Granted;
                }
                match bucket.time_until_available(now) {
                    // Only reachable through float rounding right at the boundary.
                    Wait::Ready => Admission::RetryAfter(Duration::ZERO),
                    Wait::After(wait) => Admission::RetryAfter(wait),
                    Wait::Never => Admission::Exhausted,
                }
            })
            .unwrap_or(Admission::Exhausted)
    }

    /// Capacity after refilling to the current instant.
    pub fn available(&self) -> f64 {
        let clock = &self.registry.clock;
        self.registry
            .buckets
            .with_entry_mut(&self.owner, |bucket| {
                bucket.refill(clock.now());
                bucket.capacity()
            })
            .unwrap_or(0.0)
    }
}
