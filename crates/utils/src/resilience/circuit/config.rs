//! Configuration structs for retry, timeout and circuit breaker behavior.

use rand::Rng;
use std::time::Duration;

/// Default maximum number of attempts, including the first
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff (100ms)
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default maximum delay for exponential backoff (10s)
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Jitter multiplies each delay by a factor drawn from this range
const JITTER_RANGE: std::ops::RangeInclusive<f64> = 0.75..=1.25;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Randomize each delay by a factor in `[0.75, 1.25]`
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a retry config for calls to the remote secret store
    pub fn for_network() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }

    /// A config that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    ///
    /// `min(base * 2^attempt * jitter, max_delay)`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let factor = if self.jitter {
            rand::thread_rng().gen_range(JITTER_RANGE)
        } else {
            1.0
        };
        let exponential = self.base_delay.as_secs_f64() * 2f64.powi(attempt.min(63) as i32);
        let capped = (exponential * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Per-attempt and whole-operation time limits
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Upper bound on a single attempt
    pub attempt_timeout: Duration,
    /// Upper bound on all attempts plus the delays between them
    pub operation_deadline: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(5),
            operation_deadline: Duration::from_secs(30),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of transient failures inside the sampling window that opens the circuit
    pub failure_threshold: usize,
    /// Rolling window in which failures are counted
    pub sampling_window: Duration,
    /// How long the circuit stays open before admitting a trial
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            sampling_window: Duration::from_secs(60),
            break_duration: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_calculate_delay_without_jitter() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            jitter: false,
            ..Default::default()
        };

        assert_eq!(config.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(config.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(config.calculate_delay(3), Duration::from_millis(500));
        assert_eq!(config.calculate_delay(40), Duration::from_millis(500));
    }

    #[test]
    fn test_calculate_delay_with_jitter() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
            ..Default::default()
        };

        let delays: Vec<_> = (0..20).map(|_| config.calculate_delay(2)).collect();

        let unique_delays: HashSet<_> = delays.iter().collect();
        assert!(unique_delays.len() > 1);

        // 400ms scaled into [0.75, 1.25]
        for delay in delays {
            assert!(delay >= Duration::from_millis(300));
            assert!(delay <= Duration::from_millis(500));
        }
    }

    #[test]
    fn test_jitter_never_exceeds_cap() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(100),
            jitter: true,
            ..Default::default()
        };
        for _ in 0..20 {
            assert!(config.calculate_delay(0) <= Duration::from_millis(100));
        }
    }
}
