//! Secret resolution against a remote secret store
//!
//! - [`client`] - transports and the resilient [`RemoteClient`]
//! - [`resolver`] - batch resolution of `op://` style references
//! - [`settings`] - [`ClientConfig`] read from files or the environment

pub mod client;
pub mod resolver;
pub mod settings;

pub use client::{HttpTransport, MemoryTransport, RemoteClient, SecretStoreTransport, TransportOp};
pub use resolver::{BatchOptions, BatchResolver, ResolutionResult, SecretResolver};
pub use settings::ClientConfig;

use std::sync::Arc;
use vaultlink_core::Result;

/// Build an HTTPS-backed batch resolver from settings
pub fn resolver_from_config(config: &ClientConfig) -> Result<BatchResolver> {
    let client = RemoteClient::from_config(config)?;
    Ok(BatchResolver::with_options(
        Arc::new(client),
        BatchOptions::from(config),
    ))
}
