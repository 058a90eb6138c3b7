//! In-process transport for tests and local demos

use super::transport::SecretStoreTransport;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use vaultlink_core::{Container, Error, Item, ItemSummary, Result};

/// The four remote operations, used to count calls and script failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOp {
    ListContainers,
    GetContainer,
    ListItems,
    GetItem,
}

#[derive(Debug)]
struct StoredContainer {
    container: Container,
    items: Vec<Item>,
}

/// Transport serving containers and items from memory.
///
/// Every call is counted per operation. Failures queued with
/// [`MemoryTransport::push_failure`] are returned, in order, by the next
/// calls of that operation before any real lookup happens.
#[derive(Debug)]
pub struct MemoryTransport {
    endpoint: String,
    containers: RwLock<Vec<StoredContainer>>,
    failures: Mutex<HashMap<TransportOp, VecDeque<Error>>>,
    calls: Mutex<HashMap<TransportOp, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            endpoint: "memory://secret-store".to_string(),
            containers: RwLock::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            latency: Mutex::new(None),
        }
    }

    /// Add an empty container; replaces any container with the same id
    pub fn add_container(&self, id: impl Into<String>, name: impl Into<String>) {
        let now = Utc::now();
        let container = Container {
            id: id.into(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let mut containers = self.containers.write();
        containers.retain(|stored| stored.container.id != container.id);
        containers.push(StoredContainer {
            container,
            items: Vec::new(),
        });
    }

    /// Add an item to the container with id `container_id`
    pub fn add_item(&self, container_id: &str, item: Item) -> Result<()> {
        let mut containers = self.containers.write();
        let stored = containers
            .iter_mut()
            .find(|stored| stored.container.id == container_id)
            .ok_or_else(|| Error::container_not_found(container_id))?;
        stored.items.retain(|existing| existing.id != item.id);
        stored.items.push(item);
        Ok(())
    }

    /// Queue an error for the next call of `op`
    pub fn push_failure(&self, op: TransportOp, error: Error) {
        self.failures.lock().entry(op).or_default().push_back(error);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Number of calls made for `op`, including failed ones
    pub fn calls(&self, op: TransportOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Highest number of calls that were running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn begin(&self, op: TransportOp) -> Result<InFlight<'_>> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        let in_flight = InFlight::enter(self);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = self
            .failures
            .lock()
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(error) => Err(error),
            None => Ok(in_flight),
        }
    }
}

struct InFlight<'a> {
    transport: &'a MemoryTransport,
}

impl<'a> InFlight<'a> {
    fn enter(transport: &'a MemoryTransport) -> Self {
        let now = transport.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        transport.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { transport }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.transport.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecretStoreTransport for MemoryTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        let _call = self.begin(TransportOp::ListContainers).await?;
        Ok(self
            .containers
            .read()
            .iter()
            .map(|stored| stored.container.clone())
            .collect())
    }

    async fn get_container(&self, container_id: &str) -> Result<Container> {
        let _call = self.begin(TransportOp::GetContainer).await?;
        self.containers
            .read()
            .iter()
            .find(|stored| stored.container.id == container_id)
            .map(|stored| stored.container.clone())
            .ok_or_else(|| Error::container_not_found(container_id))
    }

    async fn list_items(&self, container_id: &str) -> Result<Vec<ItemSummary>> {
        let _call = self.begin(TransportOp::ListItems).await?;
        let containers = self.containers.read();
        let stored = containers
            .iter()
            .find(|stored| stored.container.id == container_id)
            .ok_or_else(|| Error::container_not_found(container_id))?;
        Ok(stored
            .items
            .iter()
            .map(|item| ItemSummary {
                id: item.id.clone(),
                title: item.title.clone(),
                category: item.category.clone(),
            })
            .collect())
    }

    async fn get_item(&self, container_id: &str, item_id: &str) -> Result<Item> {
        let _call = self.begin(TransportOp::GetItem).await?;
        let containers = self.containers.read();
        let stored = containers
            .iter()
            .find(|stored| stored.container.id == container_id)
            .ok_or_else(|| Error::container_not_found(container_id))?;
        stored
            .items
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
            .ok_or_else(|| Error::item_not_found(container_id, item_id))
    }
}
