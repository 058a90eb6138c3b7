//! Raw access to the remote secret store

use async_trait::async_trait;
use vaultlink_core::{Container, Item, ItemSummary, Result};

/// One request/response exchange with the secret store, without retries.
///
/// Implementations map remote failures onto [`vaultlink_core::Error`] with
/// full addressing context; resilience is layered on top by the client.
#[async_trait]
pub trait SecretStoreTransport: Send + Sync {
    /// Human-readable endpoint used in errors and logs
    fn endpoint(&self) -> &str;

    /// `GET /v1/vaults`
    async fn list_containers(&self) -> Result<Vec<Container>>;

    /// `GET /v1/vaults/{id}`
    async fn get_container(&self, container_id: &str) -> Result<Container>;

    /// `GET /v1/vaults/{id}/items`
    async fn list_items(&self, container_id: &str) -> Result<Vec<ItemSummary>>;

    /// `GET /v1/vaults/{id}/items/{itemId}`
    async fn get_item(&self, container_id: &str, item_id: &str) -> Result<Item>;
}
