//! Integration tests for circuit breaker functionality.
//!
//! These tests focus on testing the interaction between different modules
//! and overall circuit breaker behavior.

#[cfg(test)]
mod integration_tests {
    use super::super::{
        config::{CircuitBreakerConfig, RetryConfig, TimeoutConfig},
        retry::retry,
        state::CircuitBreaker,
        types::CircuitState,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};
    use vaultlink_core::{CancellationToken, Error, Result};

    const BREAK: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn test_full_circuit_breaker_lifecycle() {
        let cb = Arc::new(CircuitBreaker::new(
            "https://vault.example.com",
            CircuitBreakerConfig {
                failure_threshold: 3,
                sampling_window: Duration::from_secs(60),
                break_duration: BREAK,
            },
        ));
        let counter = Arc::new(AtomicUsize::new(0));

        // Initially closed
        assert_eq!(cb.state(), CircuitState::Closed);

        for _ in 0..3 {
            let _: Result<()> = cb
                .call(|| async {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::http("https://vault.example.com", 503))
                })
                .await;
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        // Calls within the break are rejected without invoking the operation
        sleep(BREAK / 2).await;
        let result: Result<()> = cb
            .call(|| async {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::CircuitOpen { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        sleep(BREAK / 2).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // Exactly one trial runs; a concurrent caller fails fast
        let trial = {
            let cb = Arc::clone(&cb);
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                cb.call(|| async {
                    counter.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_secs(1)).await;
                    Ok(())
                })
                .await
            })
        };
        tokio::task::yield_now().await;
        assert!(cb.stats().trial_in_flight);

        let concurrent: Result<()> = cb
            .call(|| async {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(
            concurrent,
            Err(Error::CircuitOpen {
                retry_after: None,
                ..
            })
        ));

        trial.await.unwrap().unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(counter.load(Ordering::SeqCst), 4);

        let stats = cb.stats();
        assert_eq!(stats.total_calls, 4);
        assert_eq!(stats.rejected_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_outcome_ignored_after_transition() {
        let cb = Arc::new(CircuitBreaker::new(
            "https://vault.example.com",
            CircuitBreakerConfig {
                failure_threshold: 1,
                sampling_window: Duration::from_secs(60),
                break_duration: BREAK,
            },
        ));

        // A slow call admitted while closed
        let slow = {
            let cb = Arc::clone(&cb);
            tokio::spawn(async move {
                cb.call(|| async {
                    sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
                .await
            })
        };
        tokio::task::yield_now().await;

        let _: Result<()> = cb
            .call(|| async { Err(Error::network("https://vault.example.com", "reset")) })
            .await;
        assert_eq!(cb.state(), CircuitState::Open);

        // Its success belongs to the previous generation and cannot close the circuit
        slow.await.unwrap().unwrap();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_two_transient_failures() {
        let retry_config = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
        };
        let attempts = Mutex::new(Vec::new());

        let result = retry(
            &retry_config,
            &TimeoutConfig::default(),
            "get_item",
            &CancellationToken::new(),
            || {
                let mut seen = attempts.lock();
                seen.push(Instant::now());
                let n = seen.len();
                async move {
                    if n < 3 {
                        Err(Error::http("https://vault.example.com", 503))
                    } else {
                        Ok("value")
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), "value");

        let seen = attempts.lock();
        assert_eq!(seen.len(), 3);
        let first = seen[1] - seen[0];
        let second = seen[2] - seen[1];
        assert!(first >= Duration::from_millis(75) && first <= Duration::from_millis(125));
        assert!(second >= Duration::from_millis(150) && second <= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_counts_one_failure_per_exhausted_retry() {
        let cb = CircuitBreaker::new(
            "https://vault.example.com",
            CircuitBreakerConfig {
                failure_threshold: 2,
                ..Default::default()
            },
        );
        let calls = AtomicUsize::new(0);
        let cancel = CancellationToken::new();
        let retry_config = RetryConfig::default();
        let timeouts = TimeoutConfig::default();

        let result: Result<()> = cb
            .call(|| {
                retry(
                    &retry_config,
                    &timeouts,
                    "get_item",
                    &cancel,
                    || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Err(Error::network("https://vault.example.com", "reset")) }
                    },
                )
            })
            .await;

        assert!(matches!(
            result,
            Err(Error::TransientNetworkFailure { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.stats().failure_count, 1);
    }
}
