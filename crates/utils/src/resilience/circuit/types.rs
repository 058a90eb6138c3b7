//! Core types and enums for circuit breaker functionality.

use std::fmt;
use tokio::time::Instant;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed - requests pass through normally
    Closed,
    /// Circuit is open - requests fail immediately
    Open,
    /// Circuit is half-open - a single trial tests recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Statistics about circuit breaker state
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    /// Failures counted in the current sampling window
    pub failure_count: usize,
    /// Calls admitted since the breaker was created
    pub total_calls: u64,
    /// Calls rejected without invoking the operation
    pub rejected_calls: u64,
    /// Whether a half-open trial is currently running
    pub trial_in_flight: bool,
    pub last_state_change: Instant,
}
