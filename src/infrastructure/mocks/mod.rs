//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters,
//! enabling controlled testing of admission and dispatch logic.

pub mod clock;
pub mod invoker;
pub mod layer;

pub use clock::MockClock;
pub use invoker::{CallRecord, RequestParams, ScriptedInvoker};
pub use layer::MockCaptureLayer;
