//! Conversion implementations for error types
//!
//! Only conversions that cannot lose addressing context live here. Remote
//! failures are always built through the constructors in `builders.rs` so the
//! endpoint, container and item are attached at the call site.

use super::types::Error;
use std::path::PathBuf;

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "io".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: format!("invalid JSON at line {}, column {}", error.line(), error.column()),
            source: error,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Configuration {
            message: format!("{error:#}"),
        }
    }
}
