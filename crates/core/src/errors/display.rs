//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedReference { reference, reason } => {
                write!(f, "malformed secret reference '{reference}': {reason}")
            }
            Error::AuthenticationFailure { endpoint } => {
                write!(f, "authentication failed for '{endpoint}'")
            }
            Error::AccessDenied { resource } => {
                write!(f, "access denied to '{resource}'")
            }
            Error::ContainerNotFound { container } => {
                write!(f, "container '{container}' not found")
            }
            Error::ItemNotFound { container, item } => {
                write!(f, "item '{item}' not found in container '{container}'")
            }
            Error::FieldNotFound {
                container,
                item,
                section,
                field,
            } => match section {
                Some(section) => write!(
                    f,
                    "field '{field}' not found in section '{section}' of item '{item}' in container '{container}'"
                ),
                None => write!(
                    f,
                    "field '{field}' not found in item '{item}' in container '{container}'"
                ),
            },
            Error::SizeExceeded {
                container,
                item,
                field,
                actual,
                max,
            } => {
                write!(
                    f,
                    "field '{field}' of item '{item}' in container '{container}' is {actual} bytes, \
                     exceeding the maximum of {max} bytes"
                )
            }
            Error::BatchSizeExceeded { count, max } => {
                write!(f, "batch of {count} references exceeds the maximum of {max}")
            }
            Error::BatchTimeout { budget, unresolved } => {
                write!(
                    f,
                    "batch resolution exceeded its {budget:?} budget with {unresolved} references unresolved"
                )
            }
            Error::Http { endpoint, status } => {
                write!(f, "request to '{endpoint}' failed with status {status}")
            }
            Error::Network { endpoint, message } => {
                write!(f, "network error for '{endpoint}': {message}")
            }
            Error::Timeout {
                operation,
                duration,
            } => {
                write!(f, "operation '{operation}' timed out after {duration:?}")
            }
            Error::TransientNetworkFailure {
                operation,
                attempts,
                source,
            } => {
                write!(
                    f,
                    "network failure after {attempts} attempts for '{operation}': {source}"
                )
            }
            Error::CircuitOpen {
                endpoint,
                retry_after,
            } => match retry_after {
                Some(after) => write!(
                    f,
                    "circuit open for '{endpoint}', calls rejected for another {after:?}"
                ),
                None => write!(f, "circuit open for '{endpoint}', trial already in flight"),
            },
            Error::Cancelled { operation } => {
                write!(f, "operation '{operation}' was cancelled")
            }
            Error::ShutDown { component } => {
                write!(f, "{component} has already been shut down")
            }
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
            Error::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system {} operation failed for '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Error::Json { message, .. } => {
                write!(f, "JSON error: {message}")
            }
        }
    }
}
