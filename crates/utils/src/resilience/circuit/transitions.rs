//! State transition logic for circuit breaker.
//!
//! ```text
//! Closed   --failures >= threshold within window-->  Open
//! Open     --break duration elapsed, next caller-->  HalfOpen (caller is the trial)
//! HalfOpen --trial succeeds-->                       Closed
//! HalfOpen --trial fails-->                          Open (fresh break timer)
//! ```
//!
//! Every decision is taken while holding the breaker mutex, so admission and
//! recording are atomic with respect to each other.

use super::config::CircuitBreakerConfig;
use super::metrics::{BreakerInner, MetricsState};
use super::types::CircuitState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use vaultlink_core::Error;

/// Ticket handed to an admitted call
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    pub generation: u64,
    /// This call is the single half-open trial
    pub trial: bool,
}

/// Handles state transitions for circuit breaker
#[derive(Debug)]
pub struct StateTransitions {
    name: String,
    config: CircuitBreakerConfig,
    metrics: Arc<MetricsState>,
}

impl StateTransitions {
    /// Create new state transitions handler
    pub fn new(name: String, config: CircuitBreakerConfig, metrics: Arc<MetricsState>) -> Self {
        Self {
            name,
            config,
            metrics,
        }
    }

    /// Admit a call or reject it with `CircuitOpen`
    pub fn admit(&self) -> Result<Admission, Error> {
        let mut inner = self.metrics.inner.lock();
        let now = Instant::now();

        let admission = match inner.state {
            CircuitState::Closed => Admission {
                generation: inner.generation,
                trial: false,
            },
            CircuitState::Open => {
                let open_until = inner.open_until.unwrap_or(now);
                if now < open_until {
                    drop(inner);
                    self.metrics.record_rejected();
                    return Err(Error::circuit_open(
                        self.name.clone(),
                        Some(open_until.saturating_duration_since(now)),
                    ));
                }
                self.transition_to_half_open(&mut inner, now);
                inner.trial_in_flight = true;
                Admission {
                    generation: inner.generation,
                    trial: true,
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    drop(inner);
                    self.metrics.record_rejected();
                    return Err(Error::circuit_open(self.name.clone(), None));
                }
                inner.trial_in_flight = true;
                Admission {
                    generation: inner.generation,
                    trial: true,
                }
            }
        };

        drop(inner);
        self.metrics.record_admitted();
        Ok(admission)
    }

    /// Record a successful call and handle state transitions
    pub fn record_success(&self, admission: Admission) {
        let mut inner = self.metrics.inner.lock();
        // Only record if we're still in the same generation
        if admission.generation != inner.generation {
            return;
        }

        match inner.state {
            CircuitState::HalfOpen if admission.trial => {
                self.transition_to_closed(&mut inner, Instant::now());
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.window_start = None;
            }
            _ => {}
        }
    }

    /// Record a transient failure and handle state transitions
    pub fn record_failure(&self, admission: Admission) {
        let mut inner = self.metrics.inner.lock();
        if admission.generation != inner.generation {
            return;
        }

        let now = Instant::now();
        match inner.state {
            CircuitState::Closed => {
                // Restart the window once the previous one has elapsed
                let window_expired = inner
                    .window_start
                    .map_or(true, |start| now.duration_since(start) > self.config.sampling_window);
                if window_expired {
                    inner.window_start = Some(now);
                    inner.failure_count = 0;
                }

                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    self.transition_to_open(&mut inner, now);
                }
            }
            CircuitState::HalfOpen if admission.trial => {
                self.transition_to_open(&mut inner, now);
            }
            _ => {}
        }
    }

    /// Give back a trial slot whose call ended without a verdict
    pub fn release(&self, admission: Admission) {
        if !admission.trial {
            return;
        }
        let mut inner = self.metrics.inner.lock();
        if admission.generation == inner.generation && inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }

    /// State as a caller would observe it right now
    pub fn observed_state(&self) -> CircuitState {
        let inner = self.metrics.inner.lock();
        match (inner.state, inner.open_until) {
            (CircuitState::Open, Some(until)) if Instant::now() >= until => CircuitState::HalfOpen,
            (state, _) => state,
        }
    }

    pub fn break_duration(&self) -> Duration {
        self.config.break_duration
    }

    fn transition_to_open(&self, inner: &mut BreakerInner, now: Instant) {
        log::warn!(
            "Circuit breaker '{}' opening for {:?} after {} failures",
            self.name,
            self.config.break_duration,
            inner.failure_count
        );
        Self::enter(inner, CircuitState::Open, now);
        inner.open_until = Some(now + self.config.break_duration);
    }

    fn transition_to_half_open(&self, inner: &mut BreakerInner, now: Instant) {
        log::info!("Circuit breaker '{}' entering half-open state", self.name);
        Self::enter(inner, CircuitState::HalfOpen, now);
    }

    fn transition_to_closed(&self, inner: &mut BreakerInner, now: Instant) {
        log::info!("Circuit breaker '{}' closing", self.name);
        Self::enter(inner, CircuitState::Closed, now);
    }

    fn enter(inner: &mut BreakerInner, state: CircuitState, now: Instant) {
        inner.state = state;
        inner.last_state_change = now;
        inner.open_until = None;
        inner.generation += 1;
        inner.reset_counters();
    }
}
