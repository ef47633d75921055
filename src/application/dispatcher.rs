//! Throttled dispatch of remote calls.
//!
//! Every outbound call passes through [`ThrottledDispatcher::dispatch`], which
//! layers two defences against remote quota rejections:
//!
//! 1. Local admission: consume one unit from the action's bucket, waiting for
//!    a refill when the bucket is empty.
//! 2. Reactive backoff: when the remote service still reports throttling,
//!    wait with bounded exponential backoff and go back to step 1.
//!
//! Bucket access is held only for the refill-and-consume step. Waiting and
//! the remote call itself happen without holding any bucket.

use crate::application::backoff::BackoffConfig;
use crate::application::error::{ConfigError, DispatchError};
use crate::application::metrics::Metrics;
use crate::application::ports::{RemoteInvoker, Storage};
use crate::application::registry::{Admission, BucketHandle, PolicyRegistry};
use crate::domain::{action::ActionName, bucket::TokenBucket, remote::RemoteError};
use crate::infrastructure::storage::ShardedStorage;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Single choke point for calls to a rate-limited remote service.
///
/// Cheap to clone; clones share the registry and metrics.
#[derive(Debug)]
pub struct ThrottledDispatcher<S = ShardedStorage<ActionName, TokenBucket>>
where
    S: Storage<ActionName, TokenBucket>,
{
    registry: Arc<PolicyRegistry<S>>,
    backoff: BackoffConfig,
    metrics: Metrics,
}

impl<S> Clone for ThrottledDispatcher<S>
where
    S: Storage<ActionName, TokenBucket>,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            backoff: self.backoff,
            metrics: self.metrics.clone(),
        }
    }
}

impl<S> ThrottledDispatcher<S>
where
    S: Storage<ActionName, TokenBucket>,
{
    /// Create a dispatcher over a registry.
    pub fn new(registry: Arc<PolicyRegistry<S>>, backoff: BackoffConfig) -> Self {
        Self {
            registry,
            backoff,
            metrics: Metrics::new(),
        }
    }

    /// Dispatch one call for `action`.
    ///
    /// `invoke` is called once per admitted attempt and must perform exactly
    /// one remote request.
    ///
    /// # Errors
    /// - `DispatchError::Configuration` if the action cannot be resolved, or
    ///   its bucket is empty and can never refill. Never retried.
    /// - `DispatchError::DeadlineExceeded` if an admission wait or backoff
    ///   delay would run past `deadline`. Capacity is only consumed for
    ///   calls that are actually sent.
    /// - `DispatchError::ThrottleExhausted` once every retry has been spent:
    ///   the `max_retries + 1`-th rejection is returned without another
    ///   remote call.
    /// - `DispatchError::Remote` for any other remote failure, unchanged.
    pub async fn dispatch<R, E, F, Fut>(
        &self,
        action: &str,
        deadline: Option<Instant>,
        mut invoke: F,
    ) -> Result<R, DispatchError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, RemoteError<E>>>,
    {
        let mut rejections: u32 = 0;

        loop {
            let bucket = self.registry.resolve(action)?;
            self.admit(action, &bucket, deadline).await?;
            self.metrics.record_admitted();

            match invoke().await {
                Ok(response) => return Ok(response),
                Err(RemoteError::Failed(e)) => {
                    self.metrics.record_remote_failure();
                    return Err(DispatchError::Remote(e));
                }
                Err(RemoteError::Throttled) => {
                    self.metrics.record_remote_rejection();
                    rejections += 1;

                    if rejections > self.backoff.max_retries {
                        warn!(
                            action,
                            attempts = rejections,
                            "remote service kept throttling, giving up"
                        );
                        self.metrics.record_throttle_exhausted();
                        return Err(DispatchError::ThrottleExhausted {
                            action: ActionName::new(action),
                            attempts: rejections,
                        });
                    }

                    let delay = self.backoff.delay_for(rejections - 1);
                    warn!(
                        action,
                        bucket = %bucket.owner(),
                        attempt = rejections,
                        delay_ms = millis(delay),
                        "remote service throttled request, backing off"
                    );
                    self.pause(action, Phase::Backoff, delay, deadline).await?;
                }
            }
        }
    }

    /// Dispatch one call through a [`RemoteInvoker`].
    ///
    /// # Errors
    /// Same as [`dispatch`](Self::dispatch).
    pub async fn call<I>(
        &self,
        invoker: &I,
        action: &str,
        request: &I::Request,
        deadline: Option<Instant>,
    ) -> Result<I::Response, DispatchError<I::Error>>
    where
        I: RemoteInvoker,
    {
        let name = ActionName::new(action);
        self.dispatch(action, deadline, || invoker.invoke(&name, request))
            .await
    }

    /// The registry this dispatcher admits calls against.
    pub fn registry(&self) -> &Arc<PolicyRegistry<S>> {
        &self.registry
    }

    /// The backoff schedule for remote rejections.
    pub fn backoff(&self) -> &BackoffConfig {
        &self.backoff
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Wait until the bucket grants one unit.
    ///
    /// Unbounded unless a deadline is given: local accounting always
    /// eventually grants capacity for a refilling bucket.
    async fn admit<E>(
        &self,
        action: &str,
        bucket: &BucketHandle<'_, S>,
        deadline: Option<Instant>,
    ) -> Result<(), DispatchError<E>> {
        loop {
            if let Some(deadline) = deadline {
                if self.registry.clock().now() > deadline {
                    return Err(self.deadline_exceeded(action, Phase::Admission));
                }
            }

            match bucket.try_acquire() {
                Admission::Granted => return Ok(()),
                Admission::Exhausted => {
                    return Err(ConfigError::NeverRefills(bucket.owner().clone()).into());
                }
                Admission::RetryAfter(wait) => {
                    self.metrics.record_admission_wait();
                    debug!(
                        action,
                        bucket = %bucket.owner(),
                        wait_ms = millis(wait),
                        "waiting for local capacity"
                    );
                    self.pause(action, Phase::Admission, wait, deadline).await?;
                }
            }
        }
    }

    /// Sleep for `delay`, or fail now if that would pass the deadline.
    async fn pause<E>(
        &self,
        action: &str,
        phase: Phase,
        delay: Duration,
        deadline: Option<Instant>,
    ) -> Result<(), DispatchError<E>> {
        if let Some(deadline) = deadline {
            let wake = self.registry.clock().now().checked_add(delay);
            if wake.map_or(true, |wake| wake > deadline) {
                return Err(self.deadline_exceeded(action, phase));
            }
        }
        tokio::time::sleep(delay).await;
        Ok(())
    }

    fn deadline_exceeded<E>(&self, action: &str, phase: Phase) -> DispatchError<E> {
        match phase {
            Phase::Admission => debug!(action, "deadline exceeded waiting for local capacity"),
            Phase::Backoff => debug!(action, "deadline exceeded during throttling backoff"),
        }
        self.metrics.record_deadline_exceeded();
        DispatchError::DeadlineExceeded {
            action: ActionName::new(action),
        }
    }
}

/// Where a dispatch was waiting when its deadline ran out.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Admission,
    Backoff,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
