//! Domain layer - pure quota logic with no I/O.
//!
//! - Action names
//! - Rate policies (direct and alias)
//! - Token bucket accounting
//! - Remote outcome types
//!
//! Every time-dependent operation takes the current instant as an argument,
//! so all types here are deterministic under test.

pub mod action;
pub mod bucket;
pub mod policy;
pub mod remote;
