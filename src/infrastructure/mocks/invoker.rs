//! Scripted remote invoker for testing.

use crate::application::ports::RemoteInvoker;
use crate::domain::{action::ActionName, remote::RemoteError};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Parameter map a client pack sends for one call.
pub type RequestParams = BTreeMap<String, String>;

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Action the call was made for
    pub action: ActionName,
    /// Request parameters
    pub params: RequestParams,
    /// Tokio time of the call (virtual under a paused runtime)
    pub at: tokio::time::Instant,
}

/// Invoker that replays scripted outcomes in order.
///
/// Once the script is empty, every further call returns the fallback
/// outcome. Clones share the script and the call log.
///
/// # Examples
///
/// ```
/// use call_throttle::infrastructure::mocks::ScriptedInvoker;
/// use call_throttle::RemoteError;
///
/// let invoker: ScriptedInvoker<&str, String> = ScriptedInvoker::new(Ok("done"))
///     .then(Err(RemoteError::Throttled));
/// assert_eq!(invoker.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedInvoker<R, E> {
    inner: Arc<Mutex<Inner<R, E>>>,
    latency: Duration,
}

#[derive(Debug)]
struct Inner<R, E> {
    script: VecDeque<Result<R, RemoteError<E>>>,
    fallback: Result<R, RemoteError<E>>,
    calls: Vec<CallRecord>,
}

impl<R: Clone, E: Clone> ScriptedInvoker<R, E> {
    /// Create an invoker that always returns `fallback`.
    pub fn new(fallback: Result<R, RemoteError<E>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                script: VecDeque::new(),
                fallback,
                calls: Vec::new(),
            })),
            latency: Duration::ZERO,
        }
    }

    /// Queue an outcome ahead of the fallback.
    pub fn then(self, outcome: Result<R, RemoteError<E>>) -> Self {
        self.lock().script.push_back(outcome);
        self
    }

    /// Queue `count` throttling rejections.
    pub fn then_throttled(self, count: usize) -> Self {
        {
            let mut inner = self.lock();
            for _ in 0..count {
                inner.script.push_back(Err(RemoteError::Throttled));
            }
        }
        self
    }

    /// Simulate network latency on every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// All calls received, in order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<R, E>> {
        self.inner
            .lock()
            .expect("ScriptedInvoker mutex poisoned - a test thread panicked while holding the lock")
    }
}

#[async_trait]
impl<R, E> RemoteInvoker for ScriptedInvoker<R, E>
where
    R: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Request = RequestParams;
    type Response = R;
    type Error = E;

    async fn invoke(
        &self,
        action: &ActionName,
        request: &RequestParams,
    ) -> Result<R, RemoteError<E>> {
        let outcome = {
            let mut inner = self.lock();
            inner.calls.push(CallRecord {
                action: action.clone(),
                params: request.clone(),
                at: tokio::time::Instant::now(),
            });
            match inner.script.pop_front() {
                Some(outcome) => outcome,
                None => inner.fallback.clone(),
            }
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_script_then_fallback() {
        let invoker: ScriptedInvoker<u32, String> = ScriptedInvoker::new(Ok(7))
            .then_throttled(1)
            .then(Err(RemoteError::Failed("bad".to_string())));
        let action = ActionName::from("getOrder");
        let params = RequestParams::from([("AmazonOrderId".to_string(), "1".to_string())]);

        assert_eq!(
            invoker.invoke(&action, &params).await,
            Err(RemoteError::Throttled)
        );
        assert_eq!(
            invoker.invoke(&action, &params).await,
            Err(RemoteError::Failed("bad".to_string()))
        );
        assert_eq!(invoker.invoke(&action, &params).await, Ok(7));
        assert_eq!(invoker.invoke(&action, &params).await, Ok(7));

        let calls = invoker.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].params.get("AmazonOrderId").map(String::as_str), Some("1"));
    }
}
