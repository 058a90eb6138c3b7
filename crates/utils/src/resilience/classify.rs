//! Outcome classification for remote calls.
//!
//! Every stage of the pipeline asks the same question of a finished attempt:
//! did it succeed, is it worth trying again, or is it final?

use vaultlink_core::{Error, Result};

/// HTTP statuses that indicate overload or a temporary outage
pub const TRANSIENT_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Retry-worthiness of a finished remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Overload, timeout or connection failure; another attempt may succeed
    Transient,
    /// The remote gave a definitive answer; retrying cannot change it
    Permanent,
}

/// Classify the result of one remote call
pub fn classify<T>(result: &Result<T>) -> Outcome {
    match result {
        Ok(_) => Outcome::Success,
        Err(error) => classify_error(error),
    }
}

/// Classify a failure by its kind
pub fn classify_error(error: &Error) -> Outcome {
    match error {
        Error::Http { status, .. } if TRANSIENT_STATUSES.contains(status) => Outcome::Transient,
        Error::Network { .. } | Error::Timeout { .. } | Error::TransientNetworkFailure { .. } => {
            Outcome::Transient
        }
        _ => Outcome::Permanent,
    }
}
