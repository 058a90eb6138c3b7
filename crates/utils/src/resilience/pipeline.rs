//! The resilience pipeline wrapped around every remote call.
//!
//! Stages, innermost first: per-attempt timeout, retry with backoff, circuit
//! breaker. The whole pipeline sits behind a [`Shutdown`] coordinator.

use super::circuit::{
    retry, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState, RetryConfig,
    TimeoutConfig,
};
use crate::shutdown::Shutdown;
use std::future::Future;
use std::time::Duration;
use vaultlink_core::{CancellationToken, Error, Result};

/// Policy knobs for a [`ResiliencePipeline`]
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub retry: RetryConfig,
    pub timeouts: TimeoutConfig,
    pub breaker: CircuitBreakerConfig,
}

/// Timeout, retry and circuit breaker for one remote endpoint
#[derive(Debug)]
pub struct ResiliencePipeline {
    endpoint: String,
    retry: RetryConfig,
    timeouts: TimeoutConfig,
    breaker: CircuitBreaker,
    shutdown: Shutdown,
}

impl ResiliencePipeline {
    pub fn new(endpoint: impl Into<String>, config: PipelineConfig) -> Self {
        let endpoint = endpoint.into();
        Self {
            breaker: CircuitBreaker::new(endpoint.clone(), config.breaker),
            shutdown: Shutdown::new(format!("client for '{endpoint}'")),
            retry: config.retry,
            timeouts: config.timeouts,
            endpoint,
        }
    }

    /// Run `operation` through the pipeline.
    ///
    /// `operation` is invoked once per attempt. Cancelling `cancel` aborts the
    /// call with `Cancelled`, as does the shutdown grace period running out.
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _in_flight = self.shutdown.enter()?;
        let teardown = self.shutdown.teardown_token();

        let result = tokio::select! {
            biased;
            _ = teardown.cancelled() => Err(Error::cancelled(operation_name)),
            result = self.breaker.call(|| {
                retry(&self.retry, &self.timeouts, operation_name, cancel, operation)
            }) => result,
        };

        if let Err(error) = &result {
            tracing::debug!(
                endpoint = %self.endpoint,
                operation = operation_name,
                error = %error,
                "Remote call failed"
            );
        }
        result
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn circuit_stats(&self) -> CircuitBreakerStats {
        self.breaker.stats()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_shut_down()
    }

    /// Refuse new calls and drain in-flight ones; see [`Shutdown::shutdown`]
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.shutdown.shutdown(grace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn pipeline(threshold: usize) -> ResiliencePipeline {
        ResiliencePipeline::new(
            "https://vault.example.com",
            PipelineConfig {
                retry: RetryConfig {
                    max_attempts: 2,
                    base_delay: Duration::from_millis(10),
                    max_delay: Duration::from_millis(100),
                    jitter: false,
                },
                timeouts: TimeoutConfig::default(),
                breaker: CircuitBreakerConfig {
                    failure_threshold: threshold,
                    sampling_window: Duration::from_secs(60),
                    break_duration: Duration::from_secs(30),
                },
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_is_not_a_network_failure() {
        let pipeline = pipeline(2);
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result: Result<()> = pipeline
                .execute("list_containers", &cancel, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(Error::http("https://vault.example.com", 502)) }
                })
                .await;
            assert!(matches!(
                result,
                Err(Error::TransientNetworkFailure { attempts: 2, .. })
            ));
        }
        assert_eq!(pipeline.circuit_state(), CircuitState::Open);

        let result: Result<()> = pipeline
            .execute("list_containers", &cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        assert!(matches!(result, Err(Error::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_passes_through_unchanged() {
        let pipeline = pipeline(1);
        let result: Result<()> = pipeline
            .execute("get_item", &CancellationToken::new(), || async {
                Err(Error::item_not_found("infra", "db"))
            })
            .await;

        assert!(matches!(result, Err(Error::ItemNotFound { .. })));
        assert_eq!(pipeline.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_calls() {
        let pipeline = pipeline(5);
        assert!(pipeline.shutdown(Duration::from_millis(10)).await);

        let result: Result<()> = pipeline
            .execute("get_item", &CancellationToken::new(), || async { Ok(()) })
            .await;
        assert!(matches!(result, Err(Error::ShutDown { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_expiry_cancels_in_flight_call() {
        let pipeline = Arc::new(pipeline(5));
        let call = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                pipeline
                    .execute("get_item", &CancellationToken::new(), || async {
                        tokio::time::sleep(Duration::from_secs(3)).await;
                        Ok(())
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        assert!(!pipeline.shutdown(Duration::from_millis(100)).await);
        let result = call.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled { .. })));
        assert_eq!(pipeline.circuit_state(), CircuitState::Closed);
    }
}
