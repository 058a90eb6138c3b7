//! Resilient client for the remote secret store
//!
//! [`RemoteClient`] routes every call through its own
//! [`ResiliencePipeline`], so the circuit breaker state is scoped to one
//! client instance. The wire is abstracted by [`SecretStoreTransport`].

mod http;
mod memory;
mod transport;

pub use http::HttpTransport;
pub use memory::{MemoryTransport, TransportOp};
pub use transport::SecretStoreTransport;

use crate::settings::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use vaultlink_core::{
    CancellationToken, Container, Error, Item, ItemSummary, Result, DEFAULT_MAX_FIELD_BYTES,
};
use vaultlink_utils::resilience::{
    CircuitBreakerStats, CircuitState, PipelineConfig, ResiliencePipeline,
};
use vaultlink_utils::tracing::remote_span;

/// Read-only client for containers, items and fields
pub struct RemoteClient {
    transport: Arc<dyn SecretStoreTransport>,
    pipeline: ResiliencePipeline,
    max_field_bytes: usize,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("endpoint", &self.endpoint())
            .field("circuit", &self.circuit_state())
            .field("max_field_bytes", &self.max_field_bytes)
            .finish()
    }
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn SecretStoreTransport>, config: PipelineConfig) -> Self {
        let pipeline = ResiliencePipeline::new(transport.endpoint(), config);
        Self {
            transport,
            pipeline,
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
        }
    }

    /// Build an HTTPS client from validated settings
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(config)?);
        Ok(Self::with_transport(transport, config))
    }

    /// Use the policy from `config` with an existing transport
    pub fn with_transport(transport: Arc<dyn SecretStoreTransport>, config: &ClientConfig) -> Self {
        Self::new(transport, config.pipeline_config()).with_max_field_bytes(config.max_field_bytes)
    }

    #[must_use]
    pub fn with_max_field_bytes(mut self, max_field_bytes: usize) -> Self {
        self.max_field_bytes = max_field_bytes;
        self
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn max_field_bytes(&self) -> usize {
        self.max_field_bytes
    }

    pub async fn list_containers(&self, cancel: &CancellationToken) -> Result<Vec<Container>> {
        self.pipeline
            .execute("list_containers", cancel, || self.transport.list_containers())
            .instrument(remote_span("list_containers", self.endpoint()))
            .await
    }

    pub async fn get_container(
        &self,
        container_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Container> {
        self.pipeline
            .execute("get_container", cancel, || {
                self.transport.get_container(container_id)
            })
            .instrument(remote_span("get_container", self.endpoint()))
            .await
    }

    /// Find a container by its exact name
    pub async fn get_container_by_name(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Container> {
        self.list_containers(cancel)
            .await?
            .into_iter()
            .find(|container| container.name == name)
            .ok_or_else(|| Error::container_not_found(name))
    }

    pub async fn list_items(
        &self,
        container_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ItemSummary>> {
        self.pipeline
            .execute("list_items", cancel, || self.transport.list_items(container_id))
            .instrument(remote_span("list_items", self.endpoint()))
            .await
    }

    /// Fetch an item with all its fields.
    ///
    /// Fails with `SizeExceeded` if any field value is larger than the
    /// configured maximum.
    pub async fn get_item(
        &self,
        container_id: &str,
        item_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Item> {
        let item = self
            .pipeline
            .execute("get_item", cancel, || {
                self.transport.get_item(container_id, item_id)
            })
            .instrument(remote_span("get_item", self.endpoint()))
            .await?;

        if let Some(field) = item
            .fields
            .iter()
            .find(|field| field.byte_size() > self.max_field_bytes)
        {
            return Err(Error::size_exceeded(
                container_id,
                &item.title,
                &field.label,
                field.byte_size(),
                self.max_field_bytes,
            ));
        }
        Ok(item)
    }

    /// Find an item by its exact title, then fetch it in full
    pub async fn get_item_by_name(
        &self,
        container_id: &str,
        title: &str,
        cancel: &CancellationToken,
    ) -> Result<Item> {
        let summary = self
            .list_items(container_id, cancel)
            .await?
            .into_iter()
            .find(|item| item.title == title)
            .ok_or_else(|| Error::item_not_found(container_id, title))?;
        self.get_item(container_id, &summary.id, cancel).await
    }

    /// Value of the field with exactly `label` in the given item
    pub async fn get_field_value(
        &self,
        container_id: &str,
        item_id: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let item = self.get_item(container_id, item_id, cancel).await?;
        item.find_field(None, label)
            .map(|field| field.value.clone())
            .ok_or_else(|| Error::field_not_found(container_id, item_id, None, label))
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.pipeline.circuit_state()
    }

    pub fn circuit_stats(&self) -> CircuitBreakerStats {
        self.pipeline.circuit_stats()
    }

    /// Refuse new calls and give in-flight calls `grace` to finish.
    ///
    /// Returns `false` if calls had to be cancelled.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.pipeline.shutdown(grace).await
    }
}
