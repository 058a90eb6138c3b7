//! Core error type definitions

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for vaultlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vaultlink operations using thiserror
///
/// Every variant carries enough addressing context (container, item, field,
/// counts, durations) to diagnose a failure. No variant ever holds a secret
/// value or a credential.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reference string failed validation before any remote call
    MalformedReference { reference: String, reason: String },

    /// The remote service rejected the credential
    AuthenticationFailure { endpoint: String },

    /// The credential is valid but lacks access to the resource
    AccessDenied { resource: String },

    /// No container matched the requested id or name
    ContainerNotFound { container: String },

    /// No item matched the requested id or title inside a container
    ItemNotFound { container: String, item: String },

    /// The item exists but has no field with the requested label
    FieldNotFound {
        container: String,
        item: String,
        section: Option<String>,
        field: String,
    },

    /// A field payload is larger than the configured maximum
    SizeExceeded {
        container: String,
        item: String,
        field: String,
        actual: usize,
        max: usize,
    },

    /// Too many references were submitted in a single batch
    BatchSizeExceeded { count: usize, max: usize },

    /// A batch did not complete inside its wall-clock budget
    BatchTimeout { budget: Duration, unresolved: usize },

    /// The remote service answered with a non-success status
    Http { endpoint: String, status: u16 },

    /// Low-level connection failure for a single attempt
    Network { endpoint: String, message: String },

    /// Operation timeout errors
    Timeout { operation: String, duration: Duration },

    /// Transient failures persisted through every retry attempt
    TransientNetworkFailure {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The circuit breaker rejected the call without invoking it
    CircuitOpen {
        endpoint: String,
        retry_after: Option<Duration>,
    },

    /// The caller cancelled the operation
    Cancelled { operation: String },

    /// The component no longer accepts calls
    ShutDown { component: String },

    /// Configuration errors
    Configuration { message: String },

    /// File system operations
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}
