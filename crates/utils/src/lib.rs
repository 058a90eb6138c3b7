//! Shared runtime utilities for vaultlink
//!
//! This crate provides the resilience pipeline placed around every remote
//! call, the shutdown coordinator clients use to drain in-flight work, and
//! tracing initialization.

pub mod resilience;
pub mod shutdown;
pub mod tracing;

pub use resilience::*;
pub use shutdown::{InFlightGuard, Shutdown};
