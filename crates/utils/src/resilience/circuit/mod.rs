//! Retry and circuit breaker primitives for calls to the secret store
//!
//! ## Architecture
//!
//! This module is organized into focused sub-modules:
//!
//! - [`types`] - Core types and enums (CircuitState, CircuitBreakerStats)
//! - [`config`] - Configuration structs for retry, timeout and circuit breaker behavior
//! - [`metrics`] - Guarded breaker state and statistics tracking
//! - [`transitions`] - State transition logic for circuit breakers
//! - [`state`] - Main circuit breaker state management and execution
//! - [`retry`] - Retry logic and recovery suggestions
//! - [`tests`] - Integration tests
//!
//! ## Examples
//!
//! ### Basic Retry
//!
//! ```rust,no_run
//! use vaultlink_core::CancellationToken;
//! use vaultlink_utils::resilience::circuit::{retry, RetryConfig, TimeoutConfig};
//!
//! # async fn example() -> Result<String, vaultlink_core::Error> {
//! let config = RetryConfig::for_network();
//! let cancel = CancellationToken::new();
//! let result = retry(&config, &TimeoutConfig::default(), "list_containers", &cancel, || async {
//!     // Your operation here
//!     Ok("success".to_string())
//! }).await;
//! result
//! # }
//! ```
//!
//! ### Circuit Breaker
//!
//! ```rust,no_run
//! use vaultlink_utils::resilience::circuit::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> Result<String, vaultlink_core::Error> {
//! let cb = CircuitBreaker::new("https://vault.example.com", CircuitBreakerConfig::default());
//!
//! let result = cb.call(|| async {
//!     // Your operation here
//!     Ok("success".to_string())
//! }).await;
//! result
//! # }
//! ```

pub mod config;
pub mod metrics;
pub mod retry;
pub mod state;
#[cfg(test)]
pub mod tests;
pub mod transitions;
pub mod types;

// Re-export public API
pub use config::{CircuitBreakerConfig, RetryConfig, TimeoutConfig};
pub use retry::{retry, suggest_recovery};
pub use state::{CallPermit, CircuitBreaker};
pub use types::{CircuitBreakerStats, CircuitState};
