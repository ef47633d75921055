//! # call-throttle
//!
//! Throttled call admission for remote services that enforce per-operation
//! call quotas (a burst capacity plus a slow linear restore rate).
//!
//! Every outbound call goes through a [`ThrottledDispatcher`], which:
//! 1. resolves the action's token bucket in a [`PolicyRegistry`] (following
//!    one alias hop for paginated continuation calls),
//! 2. waits until the bucket grants one unit of capacity,
//! 3. invokes the remote operation, and
//! 4. on a remote throttling rejection, backs off exponentially and tries
//!    again, up to a fixed retry budget.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use call_throttle::{
//!     BackoffConfig, PolicyRegistry, RatePolicy, RemoteError, SystemClock, ThrottledDispatcher,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = PolicyRegistry::builder()
//!     .register("listOrders", RatePolicy::direct(6.0, 0.015)?)
//!     .register("listOrdersByNextToken", RatePolicy::alias("listOrders"))
//!     .build(Arc::new(SystemClock::new()))?;
//!
//! let dispatcher = ThrottledDispatcher::new(Arc::new(registry), BackoffConfig::default());
//!
//! let page: String = dispatcher
//!     .dispatch("listOrders", None, || async {
//!         // Send the request here; report "too many requests" as RemoteError::Throttled.
//!         Ok::<_, RemoteError<std::io::Error>>("<orders/>".to_string())
//!     })
//!     .await?;
//! # let _ = page;
//! # Ok(())
//! # }
//! ```
//!
//! ## Policies
//!
//! - **Direct**: `RatePolicy::direct(burst, restore_per_second)` owns a bucket
//!   that starts full and refills continuously, capped at the burst.
//! - **Alias**: `RatePolicy::alias("target")` has no quota of its own and
//!   consumes from `target`'s bucket. The target must be a direct policy.
//!
//! Registering an action twice keeps the later policy. Overrides are logged
//! at `WARN` so accidental duplicates show up at startup.
//!
//! ## Configuration
//!
//! [`ThrottleConfig`] loads policies and backoff settings from JSON,
//! including the legacy `[burst, rate]` / `[null, null, null, target]` tuple
//! form. See [`infrastructure::config`].
//!
//! ## Deadlines
//!
//! `dispatch` accepts an optional deadline. If an admission wait or a
//! backoff delay would end after it, dispatch returns
//! [`DispatchError::DeadlineExceeded`] at once, without consuming capacity
//! for a call that was never sent.
//!
//! ## Errors
//!
//! | Error | Meaning | Retry? |
//! |-------|---------|--------|
//! | `Configuration` | unknown action, bad alias, bucket that can never refill | no, fix the config |
//! | `ThrottleExhausted` | remote kept rejecting past the retry budget | later |
//! | `DeadlineExceeded` | caller's deadline would pass first | later |
//! | `Remote` | any other remote failure, unchanged | caller decides |
//!
//! ## Observability
//!
//! Admission waits are logged at `DEBUG`, remote throttling at `WARN`.
//! Counters are available from [`ThrottledDispatcher::metrics`] and
//! per-bucket state from [`PolicyRegistry::snapshot`].

// Domain layer - pure quota logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    action::ActionName,
    bucket::{TokenBucket, Wait},
    policy::{AliasPolicy, DirectPolicy, PolicyError, RatePolicy},
    remote::RemoteError,
};

pub use application::{
    backoff::BackoffConfig,
    dispatcher::ThrottledDispatcher,
    error::{ConfigError, DispatchError},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, RemoteInvoker, Storage},
    registry::{Admission, BucketHandle, BucketSnapshot, PolicyRegistry, PolicyRegistryBuilder},
};

pub use infrastructure::{clock::SystemClock, config::ThrottleConfig, storage::ShardedStorage};
