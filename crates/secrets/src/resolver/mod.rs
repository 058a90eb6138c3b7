//! Secret resolver implementations
//!
//! [`SecretResolver`] is the seam the configuration merger depends on;
//! [`BatchResolver`] is the implementation backed by the remote store.

mod batch;
mod result;

pub use batch::{BatchOptions, BatchResolver};
pub use result::ResolutionResult;

use async_trait::async_trait;
use vaultlink_core::{CancellationToken, Result};

/// Trait for resolving a set of secret references in one go
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Resolve all `references`.
    ///
    /// # Returns
    /// * `Ok(result)` - every reference resolved; duplicates appear once
    /// * `Err(error)` - nothing resolved; the first failure is reported
    async fn resolve(
        &self,
        references: &[String],
        cancel: &CancellationToken,
    ) -> Result<ResolutionResult>;
}

#[async_trait]
impl SecretResolver for BatchResolver {
    async fn resolve(
        &self,
        references: &[String],
        cancel: &CancellationToken,
    ) -> Result<ResolutionResult> {
        BatchResolver::resolve(self, references, cancel).await
    }
}
