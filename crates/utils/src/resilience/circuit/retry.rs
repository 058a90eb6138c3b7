//! Retry logic and recovery suggestions for resilient operations.

use super::config::{RetryConfig, TimeoutConfig};
use crate::resilience::classify::{classify_error, Outcome};
use std::future::Future;
use tokio::time::{sleep, timeout, Instant};
use vaultlink_core::{CancellationToken, Error, Result};

/// Execute an operation with per-attempt timeouts and retry on transient failures.
///
/// Permanent failures are returned unchanged. Once `max_attempts` attempts
/// have failed transiently the last error is wrapped in
/// `TransientNetworkFailure`. No attempt runs past the operation deadline:
/// each attempt is bounded by whichever of the attempt timeout and the time
/// left before the deadline is shorter, and a backoff that would overrun the
/// deadline is skipped. Both stop the loop with `Timeout` carrying the
/// deadline. Cancellation is observed
/// before and during every attempt and during each backoff delay.
pub async fn retry<F, Fut, T>(
    config: &RetryConfig,
    timeouts: &TimeoutConfig,
    operation_name: &str,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::cancelled(operation_name));
        }
        attempt += 1;

        let remaining = timeouts.operation_deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(Error::timeout(operation_name, timeouts.operation_deadline));
        }
        // The last attempt before the deadline only gets what is left of it
        let deadline_bound = remaining < timeouts.attempt_timeout;
        let budget = remaining.min(timeouts.attempt_timeout);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::cancelled(operation_name)),
            result = timeout(budget, operation()) => match result {
                Ok(result) => result,
                Err(_) if deadline_bound => {
                    log::warn!(
                        "Operation '{operation_name}' hit the {:?} deadline during attempt {attempt}",
                        timeouts.operation_deadline
                    );
                    return Err(Error::timeout(operation_name, timeouts.operation_deadline));
                }
                Err(_) => Err(Error::timeout(operation_name, timeouts.attempt_timeout)),
            },
        };

        let error = match result {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("Operation '{operation_name}' succeeded after {attempt} attempts");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if classify_error(&error) == Outcome::Permanent {
            return Err(error);
        }

        if attempt >= max_attempts {
            log::warn!("Operation '{operation_name}' failed after {attempt} attempts: {error}");
            return Err(Error::transient_network_failure(
                operation_name,
                attempt,
                error,
            ));
        }

        let delay = config.calculate_delay(attempt - 1);
        if started.elapsed() + delay > timeouts.operation_deadline {
            log::warn!(
                "Operation '{operation_name}' abandoned after {attempt} attempts: next retry would exceed the {:?} deadline",
                timeouts.operation_deadline
            );
            return Err(Error::timeout(operation_name, timeouts.operation_deadline));
        }

        log::warn!(
            "Operation '{}' failed (attempt {}/{}), retrying in {:?}: {}",
            operation_name,
            attempt,
            max_attempts,
            delay,
            error
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::cancelled(operation_name)),
            _ = sleep(delay) => {}
        }
    }
}

/// Helper to suggest recovery actions based on error type
pub fn suggest_recovery(error: &Error) -> String {
    match error {
        Error::MalformedReference { .. } => {
            "Malformed reference: use the form scheme://container/item/[section/]field and \
             percent-encode '/' inside names."
                .to_string()
        }
        Error::AuthenticationFailure { .. } => {
            "Authentication failed: check that the service account token is set and has not expired."
                .to_string()
        }
        Error::AccessDenied { resource } => {
            format!("Access denied to '{resource}': grant the token read access to this container.")
        }
        Error::ContainerNotFound { .. } | Error::ItemNotFound { .. } | Error::FieldNotFound { .. } => {
            "Secret not found: verify the container, item and field names in the reference. \
             Names are matched exactly and case-sensitively."
                .to_string()
        }
        Error::SizeExceeded { max, .. } => {
            format!("Field value is larger than the {max} byte limit: store large values elsewhere or raise the limit.")
        }
        Error::BatchSizeExceeded { max, .. } => {
            format!("Too many references in one batch: split them into batches of at most {max}.")
        }
        Error::BatchTimeout { .. } | Error::Timeout { .. } => {
            "Operation timed out: the secret store is slow to respond. \
             Try again or increase the timeout if possible."
                .to_string()
        }
        Error::Network { .. } | Error::TransientNetworkFailure { .. } => {
            "Network error: Check your internet connection and try again. \
             If the problem persists, the service may be temporarily unavailable."
                .to_string()
        }
        Error::Http { status, .. } => {
            format!("The secret store answered with HTTP {status}. Check the service status page.")
        }
        Error::CircuitOpen { .. } => {
            "The secret store has been failing repeatedly and calls are paused. \
             Wait for the break to elapse before retrying."
                .to_string()
        }
        Error::Cancelled { .. } | Error::ShutDown { .. } => {
            "The operation was cancelled before it completed.".to_string()
        }
        Error::Configuration { message } => {
            format!("Configuration error: {message}. Check the VAULTLINK_* environment variables and configuration files.")
        }
        Error::FileSystem { .. } => "File system error: Check file permissions and disk space. \
             Ensure the path exists and is accessible."
            .to_string(),
        Error::Json { message, .. } => {
            format!("JSON processing error: {message}. Ensure the data is valid JSON format.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn quick_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(
            &quick_retry(5),
            &TimeoutConfig::default(),
            "get_item",
            &CancellationToken::new(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::authentication_failure("https://vault.example.com")) }
            },
        )
        .await;

        assert!(matches!(result, Err(Error::AuthenticationFailure { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_wrap_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(
            &quick_retry(3),
            &TimeoutConfig::default(),
            "get_item",
            &CancellationToken::new(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::http("https://vault.example.com", 503)) }
            },
        )
        .await;

        match result {
            Err(Error::TransientNetworkFailure {
                attempts, source, ..
            }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, Error::Http { status: 503, .. }));
            }
            other => panic!("expected TransientNetworkFailure, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_transient() {
        let calls = AtomicU32::new(0);
        let timeouts = TimeoutConfig {
            attempt_timeout: Duration::from_millis(50),
            operation_deadline: Duration::from_secs(30),
        };
        let result: Result<()> = retry(
            &quick_retry(2),
            &timeouts,
            "get_item",
            &CancellationToken::new(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::TransientNetworkFailure { attempts: 2, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_skips_remaining_retries() {
        let calls = AtomicU32::new(0);
        let timeouts = TimeoutConfig {
            attempt_timeout: Duration::from_secs(5),
            operation_deadline: Duration::from_millis(250),
        };
        let result: Result<()> = retry(
            &quick_retry(10),
            &timeouts,
            "get_item",
            &CancellationToken::new(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::network("https://vault.example.com", "reset")) }
            },
        )
        .await;

        // Delays of 100ms then 200ms: the second retry would land past 250ms
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cut_short_by_deadline() {
        let calls = AtomicU32::new(0);
        let timeouts = TimeoutConfig {
            attempt_timeout: Duration::from_secs(5),
            operation_deadline: Duration::from_secs(6),
        };
        let started = Instant::now();
        let result: Result<()> = retry(
            &quick_retry(3),
            &timeouts,
            "get_item",
            &CancellationToken::new(),
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(Error::network("https://vault.example.com", "reset"))
                    } else {
                        sleep(Duration::from_secs(60)).await;
                        Ok(())
                    }
                }
            },
        )
        .await;

        // 100ms backoff, then the second attempt only has 5.9s left
        match result {
            Err(Error::Timeout { duration, .. }) => assert_eq!(duration, Duration::from_secs(6)),
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert!(started.elapsed() <= Duration::from_secs(6));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let retry_config = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(10),
            jitter: false,
        };
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                sleep(Duration::from_secs(1)).await;
                cancel.cancel();
            })
        };

        let started = Instant::now();
        let result: Result<()> = retry(
            &retry_config,
            &TimeoutConfig::default(),
            "get_item",
            &cancel,
            || async { Err(Error::network("https://vault.example.com", "reset")) },
        )
        .await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(Error::Cancelled { .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(
            &quick_retry(3),
            &TimeoutConfig::default(),
            "get_item",
            &cancel,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        assert!(matches!(result, Err(Error::Cancelled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_suggest_recovery_mentions_batch_limit() {
        let hint = suggest_recovery(&Error::batch_size_exceeded(101, 100));
        assert!(hint.contains("100"));
    }
}
