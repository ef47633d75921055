//! Throttle configuration loading.
//!
//! A configuration document is JSON with an ordered `policies` list and an
//! optional `backoff` section:
//!
//! ```json
//! {
//!   "backoff": { "base_delay_ms": 1000, "max_delay_ms": 60000, "max_retries": 5 },
//!   "policies": [
//!     { "action": "listOrders", "burst_capacity": 6, "restore_rate_per_second": 0.015 },
//!     { "action": "listOrdersByNextToken", "alias_of": "listOrders" },
//!     ["listOrdersItems", [30, 0.5]],
//!     ["listOrdersItemsByNextToken", [null, null, null, "listOrdersItems"]]
//!   ]
//! }
//! ```
//!
//! The tuple form is the legacy layout: `[burst, rate]` for a direct policy,
//! `[null, null, null, target]` for an alias. Shapes are checked eagerly so a
//! bad entry fails at startup instead of at the first dispatch.

use crate::application::backoff::BackoffConfig;
use crate::application::dispatcher::ThrottledDispatcher;
use crate::application::error::ConfigError;
use crate::application::ports::Clock;
use crate::application::registry::PolicyRegistry;
use crate::domain::{action::ActionName, policy::RatePolicy};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Parsed throttle configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThrottleConfig {
    /// Policy entries in registration order
    pub policies: Vec<(ActionName, RatePolicy)>,
    /// Backoff applied after remote throttling
    pub backoff: BackoffConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    backoff: BackoffConfig,
    policies: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDirect {
    action: ActionName,
    burst_capacity: f64,
    restore_rate_per_second: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAlias {
    action: ActionName,
    alias_of: ActionName,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Direct(RawDirect),
    Alias(RawAlias),
    Tuple(ActionName, Vec<Value>),
}

impl ThrottleConfig {
    /// Create a configuration from already-typed entries.
    pub fn new(policies: Vec<(ActionName, RatePolicy)>, backoff: BackoffConfig) -> Self {
        Self { policies, backoff }
    }

    /// Parse a JSON configuration document.
    ///
    /// # Errors
    /// Returns `ConfigError::MalformedPolicy` for unparsable documents or
    /// entries of unknown shape, and `ConfigError::InvalidPolicy` for
    /// negative or non-finite policy parameters.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)
            .map_err(|e| ConfigError::MalformedPolicy(format!("invalid document: {}", e)))?;

        let policies = raw
            .policies
            .into_iter()
            .enumerate()
            .map(|(index, value)| parse_entry(index, value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            policies,
            backoff: raw.backoff,
        })
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    /// As [`from_json_str`](Self::from_json_str), plus
    /// `ConfigError::Unreadable` if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source: Arc::new(e),
        })?;
        Self::from_json_str(&json)
    }

    /// Build a validated registry from the policy entries.
    ///
    /// # Errors
    /// See [`PolicyRegistry::with_storage`].
    pub fn build_registry(&self, clock: Arc<dyn Clock>) -> Result<PolicyRegistry, ConfigError> {
        PolicyRegistry::from_entries(self.policies.iter().cloned(), clock)
    }

    /// Build a registry and wrap it in a dispatcher.
    ///
    /// # Errors
    /// See [`PolicyRegistry::with_storage`].
    pub fn build_dispatcher(&self, clock: Arc<dyn Clock>) -> Result<ThrottledDispatcher, ConfigError> {
        let registry = self.build_registry(clock)?;
        Ok(ThrottledDispatcher::new(Arc::new(registry), self.backoff))
    }
}

fn parse_entry(index: usize, value: Value) -> Result<(ActionName, RatePolicy), ConfigError> {
    let raw: RawEntry = serde_json::from_value(value.clone()).map_err(|_| {
        ConfigError::MalformedPolicy(format!("entry {}: unrecognised shape {}", index, value))
    })?;

    match raw {
        RawEntry::Direct(d) => direct(d.action, d.burst_capacity, d.restore_rate_per_second),
        RawEntry::Alias(a) => Ok((a.action, RatePolicy::alias(a.alias_of))),
        RawEntry::Tuple(action, fields) => parse_tuple(index, action, &fields),
    }
}

fn parse_tuple(
    index: usize,
    action: ActionName,
    fields: &[Value],
) -> Result<(ActionName, RatePolicy), ConfigError> {
    match fields {
        [burst, rate] => match (burst.as_f64(), rate.as_f64()) {
            (Some(burst), Some(rate)) => direct(action, burst, rate),
            _ => Err(ConfigError::MalformedPolicy(format!(
                "entry {} ({}): burst and rate must be numbers",
                index, action
            ))),
        },
        [Value::Null, Value::Null, Value::Null, Value::String(target)] => {
            Ok((action, RatePolicy::alias(target.as_str())))
        }
        _ => Err(ConfigError::MalformedPolicy(format!(
            "entry {} ({}): expected [burst, rate] or [null, null, null, target]",
            index, action
        ))),
    }
}

fn direct(action: ActionName, burst: f64, rate: f64) -> Result<(ActionName, RatePolicy), ConfigError> {
    match RatePolicy::direct(burst, rate) {
        Ok(policy) => Ok((action, policy)),
        Err(source) => Err(ConfigError::InvalidPolicy { action, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use std::time::{Duration, Instant};

    #[test]
    fn test_all_entry_shapes() {
        let config = ThrottleConfig::from_json_str(
            r#"{
                "policies": [
                    {"action": "getOrder", "burst_capacity": 6, "restore_rate_per_second": 0.015},
                    {"action": "listOrdersByNextToken", "alias_of": "listOrders"},
                    ["listOrders", [6, 0.015]],
                    ["listOrdersItemsByNextToken", [null, null, null, "listOrders"]]
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.policies,
            vec![
                (ActionName::from("getOrder"), RatePolicy::direct(6.0, 0.015).unwrap()),
                (ActionName::from("listOrdersByNextToken"), RatePolicy::alias("listOrders")),
                (ActionName::from("listOrders"), RatePolicy::direct(6.0, 0.015).unwrap()),
                (
                    ActionName::from("listOrdersItemsByNextToken"),
                    RatePolicy::alias("listOrders")
                ),
            ]
        );
        assert_eq!(config.backoff, BackoffConfig::default());
    }

    #[test]
    fn test_backoff_section() {
        let config = ThrottleConfig::from_json_str(
            r#"{"backoff": {"base_delay_ms": 50, "max_delay_ms": 800, "max_retries": 2}, "policies": []}"#,
        )
        .unwrap();
        assert_eq!(
            config.backoff,
            BackoffConfig::new(Duration::from_millis(50), Duration::from_millis(800), 2)
        );
    }

    #[test]
    fn test_malformed_tuples() {
        for bad in [
            r#"{"policies": [["a", [6]]]}"#,
            r#"{"policies": [["a", [6, "fast"]]]}"#,
            r#"{"policies": [["a", [1, null, null, "b"]]]}"#,
            r#"{"policies": [["a", [null, null, "b"]]]}"#,
            r#"{"policies": [{"action": "a", "burst_capacity": 1}]}"#,
            r#"{"policies": [{"action": "a", "alias_of": "b", "burst_capacity": 1}]}"#,
            r#"{"policies": [42]}"#,
        ] {
            let err = ThrottleConfig::from_json_str(bad).unwrap_err();
            assert!(
                matches!(err, ConfigError::MalformedPolicy(_)),
                "{} gave {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_negative_rate_is_invalid_policy() {
        let err = ThrottleConfig::from_json_str(r#"{"policies": [["a", [6, -1]]]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPolicy { ref action, .. } if action.as_str() == "a"));
    }

    #[test]
    fn test_build_registry_applies_overrides() {
        let config = ThrottleConfig::from_json_str(
            r#"{"policies": [["listOrders", [6, 0.015]], ["listOrders", [30, 0.5]]]}"#,
        )
        .unwrap();
        let registry = config
            .build_registry(Arc::new(MockClock::new(Instant::now())))
            .unwrap();

        assert_eq!(
            registry.policy("listOrders"),
            Some(&RatePolicy::direct(30.0, 0.5).unwrap())
        );
    }

    #[test]
    fn test_missing_file() {
        let err = ThrottleConfig::from_file("/nonexistent/throttle.json").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot read throttle configuration /nonexistent/throttle.json"
        );
        match err {
            ConfigError::Unreadable { path, source } => {
                assert_eq!(path, std::path::Path::new("/nonexistent/throttle.json"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected Unreadable, got {:?}", other),
        }
    }
}
