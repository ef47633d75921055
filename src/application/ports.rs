//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::action::ActionName;
use crate::domain::remote::RemoteError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

/// Port for obtaining current time.
///
/// Implementations must be monotonic; quota accounting breaks if time runs
/// backwards. Infrastructure provides `SystemClock` and `MockClock`.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for the concurrent bucket map.
///
/// Entries are inserted once while the registry is built and then only
/// mutated in place. Each `with_entry_mut` call holds exclusive access to
/// its entry for the duration of the accessor, which is what makes
/// refill-then-consume atomic per bucket.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Insert or replace an entry.
    fn insert(&self, key: K, value: V);

    /// Access an existing entry with mutable access.
    ///
    /// # Returns
    /// The result from the accessor, or `None` if the key is absent
    fn with_entry_mut<F, R>(&self, key: &K, accessor: F) -> Option<R>
    where
        F: FnOnce(&mut V) -> R;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Visit every entry with mutable access.
    ///
    /// Each entry is held exclusively while `f` runs on it.
    fn for_each_mut<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V);
}

/// Port for the remote operation invoker.
///
/// Client packs build a request payload for a logical action and hand it to
/// the dispatcher together with an invoker. The dispatcher never looks
/// inside requests or responses.
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    /// Request payload
    type Request: Send + Sync;
    /// Successful response payload
    type Response: Send;
    /// Non-throttling failure
    type Error: Send;

    /// Send one request for `action`.
    async fn invoke(
        &self,
        action: &ActionName,
        request: &Self::Request,
    ) -> Result<Self::Response, RemoteError<Self::Error>>;
}
