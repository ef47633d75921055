//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Policy registry (policies and the buckets they own)
//! - Throttled dispatcher (admission wait, invocation, backoff)
//! - Error taxonomy and metrics
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod backoff;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod registry;
