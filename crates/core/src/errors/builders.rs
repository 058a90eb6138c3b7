//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;
use std::time::Duration;

// Helper methods for creating errors with context
impl Error {
    /// Create a malformed reference error
    #[must_use]
    pub fn malformed_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Create an authentication failure error
    #[must_use]
    pub fn authentication_failure(endpoint: impl Into<String>) -> Self {
        Error::AuthenticationFailure {
            endpoint: endpoint.into(),
        }
    }

    /// Create an access denied error
    #[must_use]
    pub fn access_denied(resource: impl Into<String>) -> Self {
        Error::AccessDenied {
            resource: resource.into(),
        }
    }

    /// Create a container not found error
    #[must_use]
    pub fn container_not_found(container: impl Into<String>) -> Self {
        Error::ContainerNotFound {
            container: container.into(),
        }
    }

    /// Create an item not found error
    #[must_use]
    pub fn item_not_found(container: impl Into<String>, item: impl Into<String>) -> Self {
        Error::ItemNotFound {
            container: container.into(),
            item: item.into(),
        }
    }

    /// Create a field not found error
    #[must_use]
    pub fn field_not_found(
        container: impl Into<String>,
        item: impl Into<String>,
        section: Option<String>,
        field: impl Into<String>,
    ) -> Self {
        Error::FieldNotFound {
            container: container.into(),
            item: item.into(),
            section,
            field: field.into(),
        }
    }

    /// Create a size exceeded error
    #[must_use]
    pub fn size_exceeded(
        container: impl Into<String>,
        item: impl Into<String>,
        field: impl Into<String>,
        actual: usize,
        max: usize,
    ) -> Self {
        Error::SizeExceeded {
            container: container.into(),
            item: item.into(),
            field: field.into(),
            actual,
            max,
        }
    }

    /// Create a batch size exceeded error
    #[must_use]
    pub fn batch_size_exceeded(count: usize, max: usize) -> Self {
        Error::BatchSizeExceeded { count, max }
    }

    /// Create a batch timeout error
    #[must_use]
    pub fn batch_timeout(budget: Duration, unresolved: usize) -> Self {
        Error::BatchTimeout { budget, unresolved }
    }

    /// Create an HTTP status error
    #[must_use]
    pub fn http(endpoint: impl Into<String>, status: u16) -> Self {
        Error::Http {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Create a network error
    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Wrap the last transient cause once retries are exhausted
    #[must_use]
    pub fn transient_network_failure(
        operation: impl Into<String>,
        attempts: u32,
        source: Error,
    ) -> Self {
        Error::TransientNetworkFailure {
            operation: operation.into(),
            attempts,
            source: Box::new(source),
        }
    }

    /// Create a circuit open error
    #[must_use]
    pub fn circuit_open(endpoint: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Error::CircuitOpen {
            endpoint: endpoint.into(),
            retry_after,
        }
    }

    /// Create a cancellation error
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Error::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create an already-shut-down error
    #[must_use]
    pub fn shut_down(component: impl Into<String>) -> Self {
        Error::ShutDown {
            component: component.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Whether this error means the caller gave up rather than the remote failing
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled { .. } | Error::ShutDown { .. })
    }
}
