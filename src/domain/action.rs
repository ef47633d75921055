//! Logical action names.
//!
//! An action identifies one remote operation (for example `getOrder` or
//! `listOrders`). It is the unit a rate policy applies to and the key every
//! token bucket is stored under.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Name of a logical remote operation.
///
/// Cloning is cheap: the name is shared behind an `Arc<str>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionName(Arc<str>);

impl ActionName {
    /// Create an action name.
    pub fn new(name: impl AsRef<str>) -> Self {
        ActionName(Arc::from(name.as_ref()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionName {
    fn from(name: &str) -> Self {
        ActionName::new(name)
    }
}

impl From<String> for ActionName {
    fn from(name: String) -> Self {
        ActionName(Arc::from(name))
    }
}

impl Borrow<str> for ActionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ActionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
