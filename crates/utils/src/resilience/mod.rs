//! Resilience patterns for calls to the remote secret store.
//!
//! ## Key Components
//!
//! - **`classify`**: decides whether a finished call succeeded, may be retried
//!   or is final.
//! - **`circuit`**: retry with backoff and the circuit breaker that stops
//!   calling an endpoint that is known to be failing.
//! - **`pipeline`**: composes both behind a shutdown coordinator.

pub mod circuit;
pub mod classify;
pub mod pipeline;

pub use circuit::{
    retry, suggest_recovery, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats,
    CircuitState, RetryConfig, TimeoutConfig,
};
pub use classify::{classify, classify_error, Outcome, TRANSIENT_STATUSES};
pub use pipeline::{PipelineConfig, ResiliencePipeline};
