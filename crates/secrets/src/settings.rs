//! Client settings
//!
//! Settings can be deserialized from a configuration file or read from the
//! `VAULTLINK_*` environment variables. Durations are whole milliseconds.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use url::Url;
use vaultlink_core::{
    Error, Result, DEFAULT_BATCH_TIMEOUT, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_MAX_FIELD_BYTES, VAULTLINK_ATTEMPT_TIMEOUT_MS_VAR, VAULTLINK_BATCH_TIMEOUT_MS_VAR,
    VAULTLINK_MAX_ATTEMPTS_VAR, VAULTLINK_MAX_BATCH_SIZE_VAR, VAULTLINK_TOKEN_VAR,
    VAULTLINK_URL_VAR,
};
use vaultlink_utils::resilience::{
    CircuitBreakerConfig, PipelineConfig, RetryConfig, TimeoutConfig,
};
use zeroize::Zeroizing;

/// Settings for a [`RemoteClient`](crate::client::RemoteClient) and its batch resolver
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Base URL of the secret store, e.g. `https://vault.example.com`
    pub base_url: String,
    /// Service account token sent as a bearer token
    #[serde(deserialize_with = "deserialize_token")]
    token: Zeroizing<String>,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
    pub attempt_timeout_ms: u64,
    pub operation_deadline_ms: u64,
    pub failure_threshold: usize,
    pub sampling_window_ms: u64,
    pub break_duration_ms: u64,
    pub batch_timeout_ms: u64,
    pub max_batch_size: usize,
    pub max_concurrency: usize,
    pub max_field_bytes: usize,
    /// Permit plain `http` to a loopback address, for local test servers
    pub allow_insecure_loopback: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let retry = RetryConfig::for_network();
        let timeouts = TimeoutConfig::default();
        let breaker = CircuitBreakerConfig::default();
        Self {
            base_url: String::new(),
            token: Zeroizing::new(String::new()),
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay.as_millis() as u64,
            max_delay_ms: retry.max_delay.as_millis() as u64,
            jitter: retry.jitter,
            attempt_timeout_ms: timeouts.attempt_timeout.as_millis() as u64,
            operation_deadline_ms: timeouts.operation_deadline.as_millis() as u64,
            failure_threshold: breaker.failure_threshold,
            sampling_window_ms: breaker.sampling_window.as_millis() as u64,
            break_duration_ms: breaker.break_duration.as_millis() as u64,
            batch_timeout_ms: DEFAULT_BATCH_TIMEOUT.as_millis() as u64,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
            allow_insecure_loopback: false,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: Zeroizing::new(token.into()),
            ..Self::default()
        }
    }

    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, starting from the defaults.
    ///
    /// The result is validated before it is returned.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        config.base_url = lookup(VAULTLINK_URL_VAR)
            .ok_or_else(|| Error::configuration(format!("{VAULTLINK_URL_VAR} is not set")))?;
        config.token = Zeroizing::new(
            lookup(VAULTLINK_TOKEN_VAR)
                .ok_or_else(|| Error::configuration(format!("{VAULTLINK_TOKEN_VAR} is not set")))?,
        );

        if let Some(value) = lookup(VAULTLINK_MAX_ATTEMPTS_VAR) {
            config.max_attempts = parse_number(VAULTLINK_MAX_ATTEMPTS_VAR, &value)?;
        }
        if let Some(value) = lookup(VAULTLINK_ATTEMPT_TIMEOUT_MS_VAR) {
            config.attempt_timeout_ms = parse_number(VAULTLINK_ATTEMPT_TIMEOUT_MS_VAR, &value)?;
        }
        if let Some(value) = lookup(VAULTLINK_BATCH_TIMEOUT_MS_VAR) {
            config.batch_timeout_ms = parse_number(VAULTLINK_BATCH_TIMEOUT_MS_VAR, &value)?;
        }
        if let Some(value) = lookup(VAULTLINK_MAX_BATCH_SIZE_VAR) {
            config.max_batch_size = parse_number(VAULTLINK_MAX_BATCH_SIZE_VAR, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_insecure_loopback(mut self) -> Self {
        self.allow_insecure_loopback = true;
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Check the settings for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url()?;

        if self.token.trim().is_empty() {
            return Err(Error::configuration("service account token is empty"));
        }

        let limits = [
            ("maxAttempts", self.max_attempts as u64),
            ("attemptTimeoutMs", self.attempt_timeout_ms),
            ("operationDeadlineMs", self.operation_deadline_ms),
            ("failureThreshold", self.failure_threshold as u64),
            ("breakDurationMs", self.break_duration_ms),
            ("batchTimeoutMs", self.batch_timeout_ms),
            ("maxBatchSize", self.max_batch_size as u64),
            ("maxConcurrency", self.max_concurrency as u64),
            ("maxFieldBytes", self.max_field_bytes as u64),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(Error::configuration(format!("{name} must be greater than zero")));
        }

        Ok(())
    }

    /// The base URL, checked for an acceptable scheme
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            Error::configuration(format!("invalid base URL '{}': {e}", self.base_url))
        })?;

        match url.scheme() {
            "https" => Ok(url),
            "http" if self.allow_insecure_loopback && is_loopback(&url) => Ok(url),
            "http" => Err(Error::configuration(format!(
                "base URL '{}' must use https",
                self.base_url
            ))),
            other => Err(Error::configuration(format!(
                "unsupported scheme '{other}' in base URL '{}'",
                self.base_url
            ))),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            retry: RetryConfig {
                max_attempts: self.max_attempts,
                base_delay: Duration::from_millis(self.base_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms),
                jitter: self.jitter,
            },
            timeouts: TimeoutConfig {
                attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
                operation_deadline: Duration::from_millis(self.operation_deadline_ms),
            },
            breaker: CircuitBreakerConfig {
                failure_threshold: self.failure_threshold,
                sampling_window: Duration::from_millis(self.sampling_window_ms),
                break_duration: Duration::from_millis(self.break_duration_ms),
            },
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("max_attempts", &self.max_attempts)
            .field("attempt_timeout_ms", &self.attempt_timeout_ms)
            .field("operation_deadline_ms", &self.operation_deadline_ms)
            .field("batch_timeout_ms", &self.batch_timeout_ms)
            .field("max_batch_size", &self.max_batch_size)
            .field("max_concurrency", &self.max_concurrency)
            .field("max_field_bytes", &self.max_field_bytes)
            .field("allow_insecure_loopback", &self.allow_insecure_loopback)
            .finish_non_exhaustive()
    }
}

fn deserialize_token<'de, D>(deserializer: D) -> std::result::Result<Zeroizing<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Zeroizing::new)
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::configuration(format!("{name} must be a number, got '{value}'")))
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
