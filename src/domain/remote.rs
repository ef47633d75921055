//! Outcomes reported by the remote service.

use std::fmt;

/// Failure reported by a remote invocation.
///
/// Throttling is a variant of its own so the dispatcher can back off and
/// retry on it while passing every other failure through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError<E> {
    /// The remote side reported that the request quota was exceeded
    Throttled,
    /// Any other failure, not interpreted by the dispatcher
    Failed(E),
}

impl<E> RemoteError<E> {
    /// Check if this is a throttling rejection.
    pub fn is_throttled(&self) -> bool {
        matches!(self, RemoteError::Throttled)
    }
}

impl<E: fmt::Display> fmt::Display for RemoteError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Throttled => write!(f, "remote service rejected the request: too many requests"),
            RemoteError::Failed(e) => write!(f, "remote call failed: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RemoteError<E> {}
