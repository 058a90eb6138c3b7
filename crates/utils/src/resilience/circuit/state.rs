//! Circuit breaker state management and execution logic.

use super::config::CircuitBreakerConfig;
use super::metrics::MetricsState;
use super::transitions::{Admission, StateTransitions};
use super::types::{CircuitBreakerStats, CircuitState};
use crate::resilience::classify::{classify, Outcome};
use std::future::Future;
use std::sync::Arc;
use vaultlink_core::Result;

/// Circuit breaker guarding one remote endpoint
#[derive(Debug)]
pub struct CircuitBreaker {
    metrics: Arc<MetricsState>,
    transitions: StateTransitions,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for `endpoint` with the given configuration
    pub fn new(endpoint: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let metrics = Arc::new(MetricsState::new());
        let transitions = StateTransitions::new(endpoint.into(), config, Arc::clone(&metrics));

        Self {
            metrics,
            transitions,
        }
    }

    /// Get the current state of the circuit.
    ///
    /// An open circuit whose break duration has elapsed reports `HalfOpen`;
    /// the transition itself happens when the next call is admitted.
    pub fn state(&self) -> CircuitState {
        self.transitions.observed_state()
    }

    /// Execute an operation through the circuit breaker.
    ///
    /// Rejected calls fail with `CircuitOpen` without invoking `operation`.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let permit = self.acquire()?;
        let result = operation().await;
        permit.settle(&result);
        result
    }

    /// Reserve the right to make one call
    pub fn acquire(&self) -> Result<CallPermit<'_>> {
        let admission = self.transitions.admit()?;
        Ok(CallPermit {
            transitions: &self.transitions,
            admission,
            settled: false,
        })
    }

    /// Get current circuit breaker statistics
    pub fn stats(&self) -> CircuitBreakerStats {
        self.metrics.stats()
    }
}

/// An admitted call.
///
/// Dropping a permit without settling it (for example when the caller's
/// future is cancelled) frees the half-open trial slot.
#[derive(Debug)]
pub struct CallPermit<'a> {
    transitions: &'a StateTransitions,
    admission: Admission,
    settled: bool,
}

impl CallPermit<'_> {
    /// Whether this call is the half-open trial
    pub fn is_trial(&self) -> bool {
        self.admission.trial
    }

    /// Feed the call's result back into the breaker
    pub fn settle<T>(mut self, result: &Result<T>) {
        match result {
            // Cancellation says nothing about the endpoint's health
            Err(error) if error.is_cancellation() => return,
            _ => {}
        }

        self.settled = true;
        match classify(result) {
            Outcome::Success => self.transitions.record_success(self.admission),
            Outcome::Transient => self.transitions.record_failure(self.admission),
            // The remote answered definitively, so it is reachable
            Outcome::Permanent if self.admission.trial => {
                self.transitions.record_success(self.admission)
            }
            Outcome::Permanent => {}
        }
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.transitions.release(self.admission);
        }
    }
}
