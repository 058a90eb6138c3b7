//! Guarded state and statistics tracking for the circuit breaker.

use super::types::{CircuitBreakerStats, CircuitState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

/// Mutable breaker state; only ever touched while holding [`MetricsState::inner`]
#[derive(Debug)]
pub struct BreakerInner {
    pub state: CircuitState,
    /// Transient failures counted in the current sampling window
    pub failure_count: usize,
    /// Start of the current sampling window, set by the first failure in it
    pub window_start: Option<Instant>,
    /// When an open circuit may admit its trial
    pub open_until: Option<Instant>,
    pub trial_in_flight: bool,
    pub last_state_change: Instant,
    /// Bumped on every transition so outcomes of older calls are discarded
    pub generation: u64,
}

impl BreakerInner {
    /// Reset internal counters
    pub fn reset_counters(&mut self) {
        self.failure_count = 0;
        self.window_start = None;
        self.trial_in_flight = false;
    }
}

/// Internal state tracking for circuit breaker metrics
#[derive(Debug)]
pub struct MetricsState {
    pub inner: Mutex<BreakerInner>,
    pub total_calls: AtomicU64,
    pub rejected_calls: AtomicU64,
}

impl MetricsState {
    /// Create new metrics state
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                window_start: None,
                open_until: None,
                trial_in_flight: false,
                last_state_change: Instant::now(),
                generation: 0,
            }),
            total_calls: AtomicU64::new(0),
            rejected_calls: AtomicU64::new(0),
        }
    }

    pub fn record_admitted(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current circuit breaker statistics
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            rejected_calls: self.rejected_calls.load(Ordering::Relaxed),
            trial_in_flight: inner.trial_in_flight,
            last_state_change: inner.last_state_change,
        }
    }
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}
