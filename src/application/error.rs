//! Error taxonomy for registry construction and dispatch.
//!
//! - `ConfigError` is fatal: it points at a deployment defect and is never retried.
//! - `DispatchError::ThrottleExhausted` and `DispatchError::DeadlineExceeded` are
//!   transient; callers may re-submit later.
//! - `DispatchError::Remote` carries the invoker's own failure unchanged.

use crate::domain::action::ActionName;
use crate::domain::policy::PolicyError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Invalid throttle configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No policy is registered for the action
    #[error("no rate policy registered for action '{0}'")]
    UnknownAction(ActionName),

    /// An alias points at an action with no policy
    #[error("action '{action}' is an alias of '{target}', which has no rate policy")]
    DanglingAlias {
        /// The alias
        action: ActionName,
        /// The missing target
        target: ActionName,
    },

    /// An alias points at another alias (or at itself)
    #[error("action '{action}' is an alias of '{target}', which is itself an alias")]
    ChainedAlias {
        /// The alias
        action: ActionName,
        /// The target that is not a direct policy
        target: ActionName,
    },

    /// A direct policy has out-of-range parameters
    #[error("invalid rate policy for action '{action}': {source}")]
    InvalidPolicy {
        /// The action
        action: ActionName,
        /// What is wrong with it
        #[source]
        source: PolicyError,
    },

    /// A configuration entry does not have a recognised shape
    #[error("malformed rate policy entry: {0}")]
    MalformedPolicy(String),

    /// A configuration file could not be read
    #[error("cannot read throttle configuration {}", .path.display())]
    Unreadable {
        /// The file
        path: PathBuf,
        /// The I/O failure
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The bucket is empty and can never refill
    #[error("bucket '{0}' is exhausted and its policy can never restore a full unit")]
    NeverRefills(ActionName),
}

/// Failure of a throttled dispatch.
#[derive(Debug, Error)]
pub enum DispatchError<E> {
    /// The action cannot be dispatched with the current configuration
    #[error("throttle configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The remote service kept rejecting past the retry budget
    #[error("remote service kept throttling '{action}' after {attempts} attempts")]
    ThrottleExhausted {
        /// The dispatched action
        action: ActionName,
        /// Number of remote calls made, all rejected
        attempts: u32,
    },

    /// The caller's deadline elapsed before admission or success
    #[error("deadline exceeded before '{action}' could be dispatched")]
    DeadlineExceeded {
        /// The dispatched action
        action: ActionName,
    },

    /// Non-throttling failure from the remote invoker
    #[error("remote call failed: {0}")]
    Remote(E),
}

impl<E> DispatchError<E> {
    /// Check if re-submitting the call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DispatchError::ThrottleExhausted { .. } | DispatchError::DeadlineExceeded { .. }
        )
    }

    /// The remote failure, if this is a pass-through error.
    pub fn into_remote(self) -> Option<E> {
        match self {
            DispatchError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let exhausted: DispatchError<String> = DispatchError::ThrottleExhausted {
            action: ActionName::from("listOrders"),
            attempts: 6,
        };
        let deadline: DispatchError<String> = DispatchError::DeadlineExceeded {
            action: ActionName::from("listOrders"),
        };
        let config: DispatchError<String> =
            ConfigError::UnknownAction(ActionName::from("nope")).into();
        let remote: DispatchError<String> = DispatchError::Remote("boom".to_string());

        assert!(exhausted.is_transient());
        assert!(deadline.is_transient());
        assert!(!config.is_transient());
        assert!(!remote.is_transient());
    }

    #[test]
    fn test_messages_name_the_action() {
        let err = ConfigError::ChainedAlias {
            action: ActionName::from("listOrdersByNextToken"),
            target: ActionName::from("listOrdersByNextToken"),
        };
        assert_eq!(
            err.to_string(),
            "action 'listOrdersByNextToken' is an alias of 'listOrdersByNextToken', which is itself an alias"
        );

        let err: DispatchError<String> = DispatchError::Remote("bad token".to_string());
        assert_eq!(err.to_string(), "remote call failed: bad token");
        assert_eq!(err.into_remote().as_deref(), Some("bad token"));
    }
}
