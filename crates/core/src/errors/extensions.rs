//! Extension traits for error handling

use super::types::{Error, Result};

/// Extension trait for adding context to Results
///
/// Only errors without structured addressing context are rewrapped; a
/// resolution error that already names its container and item is returned
/// unchanged so callers can still match on the variant.
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a lazy message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| rewrap(e.into(), message.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| rewrap(e.into(), f()))
    }
}

fn rewrap(error: Error, message: String) -> Error {
    match error {
        Error::Configuration { message: inner } => Error::Configuration {
            message: format!("{message}: {inner}"),
        },
        Error::FileSystem { path, source, .. } => Error::FileSystem {
            path,
            operation: message,
            source,
        },
        other => other,
    }
}
