//! Batch resolution of secret references.
//!
//! A batch is all-or-nothing. Every reference is validated before the first
//! remote call, duplicates are collapsed, and each unique (container, item)
//! pair is fetched exactly once with bounded parallelism. The first failure
//! cancels the remaining fetches and fails the whole batch.

use super::result::ResolutionResult;
use crate::client::RemoteClient;
use crate::settings::ClientConfig;
use futures::future::try_join_all;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::Instrument;
use vaultlink_core::{
    CancellationToken, Container, Error, Item, ItemSummary, ReferenceSyntax, Result,
    SecretReference, DEFAULT_BATCH_TIMEOUT, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY,
};
use vaultlink_utils::tracing::batch_span;
use zeroize::Zeroizing;

/// Limits applied to each batch
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Largest number of references accepted in one call, duplicates included
    pub max_batch_size: usize,
    /// Remote calls allowed in flight at once
    pub max_concurrency: usize,
    /// Wall-clock budget for the whole batch
    pub batch_timeout: Duration,
    pub syntax: ReferenceSyntax,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            syntax: ReferenceSyntax::default(),
        }
    }
}

impl From<&ClientConfig> for BatchOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
            max_concurrency: config.max_concurrency,
            batch_timeout: config.batch_timeout(),
            ..Self::default()
        }
    }
}

/// (container, item) as segments or as remote ids
type ItemKey = (String, String);

/// Unique references grouped by container, then by item
#[derive(Debug, Default)]
struct BatchPlan {
    /// container segment -> item segment -> number of references into that item
    containers: IndexMap<String, IndexMap<String, usize>>,
}

impl BatchPlan {
    fn new<'a>(references: impl Iterator<Item = &'a SecretReference>) -> Self {
        let mut plan = Self::default();
        for reference in references {
            *plan
                .containers
                .entry(reference.container().to_string())
                .or_default()
                .entry(reference.item().to_string())
                .or_insert(0) += 1;
        }
        plan
    }

    fn item_count(&self) -> usize {
        self.containers.values().map(IndexMap::len).sum()
    }
}

/// Resolves batches of references through one [`RemoteClient`]
#[derive(Debug, Clone)]
pub struct BatchResolver {
    client: Arc<RemoteClient>,
    options: BatchOptions,
}

impl BatchResolver {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self::with_options(client, BatchOptions::default())
    }

    pub fn with_options(client: Arc<RemoteClient>, options: BatchOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Resolve every reference in `references`, or fail without a partial result.
    ///
    /// Errors, in the order they are checked:
    /// - `Configuration` for an empty batch
    /// - `BatchSizeExceeded` when more than `max_batch_size` references are given
    /// - `MalformedReference` for the first reference that does not parse;
    ///   no remote call has been made at that point
    /// - any remote failure, or `FieldNotFound` when an item lacks a field
    /// - `BatchTimeout` when the batch budget runs out
    pub async fn resolve<S>(
        &self,
        references: &[S],
        cancel: &CancellationToken,
    ) -> Result<ResolutionResult>
    where
        S: AsRef<str> + Sync,
    {
        if references.is_empty() {
            return Err(Error::configuration("no references to resolve"));
        }
        if references.len() > self.options.max_batch_size {
            return Err(Error::batch_size_exceeded(
                references.len(),
                self.options.max_batch_size,
            ));
        }

        let mut unique: IndexMap<String, SecretReference> = IndexMap::new();
        for raw in references {
            let raw = raw.as_ref();
            if !unique.contains_key(raw) {
                let reference = self.options.syntax.parse(raw)?;
                unique.insert(raw.to_string(), reference);
            }
        }

        let plan = BatchPlan::new(unique.values());
        let batch_cancel = cancel.child_token();
        let resolved = AtomicUsize::new(0);
        let budget = self.options.batch_timeout;

        tracing::debug!(
            references = references.len(),
            unique = unique.len(),
            items = plan.item_count(),
            "Resolving secret references"
        );

        let fetched = tokio::time::timeout(
            budget,
            self.fetch_items(&plan, &batch_cancel, &resolved)
                .instrument(batch_span(unique.len())),
        )
        .await;

        let items = match fetched {
            Ok(Ok(items)) => items,
            Ok(Err(error)) => {
                batch_cancel.cancel();
                return Err(error);
            }
            Err(_) => {
                batch_cancel.cancel();
                let unresolved = unique.len() - resolved.load(Ordering::SeqCst);
                tracing::warn!(
                    budget_ms = budget.as_millis() as u64,
                    unresolved,
                    "Batch resolution timed out"
                );
                return Err(Error::batch_timeout(budget, unresolved));
            }
        };

        let mut values = IndexMap::with_capacity(unique.len());
        for (raw, reference) in &unique {
            let item = items
                .get(reference.container(), reference.item())
                .ok_or_else(|| Error::item_not_found(reference.container(), reference.item()))?;
            let field = item
                .find_field(reference.section(), reference.field())
                .ok_or_else(|| {
                    Error::field_not_found(
                        reference.container(),
                        reference.item(),
                        reference.section().map(str::to_string),
                        reference.field(),
                    )
                })?;
            values.insert(raw.clone(), Zeroizing::new(field.value.clone()));
        }

        tracing::info!(
            references = values.len(),
            items = items.len(),
            "Resolved secret references"
        );
        Ok(ResolutionResult::from_values(values))
    }

    /// Fetch every planned item, at most once each.
    ///
    /// Segments are resolved to remote ids before fetching, so a container or
    /// item named once by name and once by id is still listed and fetched once.
    async fn fetch_items(
        &self,
        plan: &BatchPlan,
        cancel: &CancellationToken,
        resolved: &AtomicUsize,
    ) -> Result<FetchedItems> {
        let containers = self.client.list_containers(cancel).await?;
        let semaphore = Semaphore::new(self.options.max_concurrency);

        // container id -> (container segment, item segments) naming it
        let mut by_container: IndexMap<&str, Vec<(&str, &IndexMap<String, usize>)>> =
            IndexMap::new();
        for (segment, items) in &plan.containers {
            let container = match_container(&containers, segment)
                .ok_or_else(|| Error::container_not_found(segment))?;
            by_container
                .entry(container.id.as_str())
                .or_default()
                .push((segment.as_str(), items));
        }

        let per_container = by_container.iter().map(|(&container_id, segments)| {
            let semaphore = &semaphore;
            async move {
                let summaries = limited(
                    semaphore,
                    cancel,
                    self.client.list_items(container_id, cancel),
                )
                .await?;

                // item id -> (segment pairs naming it, references into it)
                let mut by_item: IndexMap<&str, (Vec<ItemKey>, usize)> = IndexMap::new();
                for &(container_segment, items) in segments {
                    for (item_segment, references) in items {
                        let summary = match_item(&summaries, item_segment).ok_or_else(|| {
                            Error::item_not_found(container_segment, item_segment)
                        })?;
                        let entry = by_item.entry(summary.id.as_str()).or_default();
                        entry
                            .0
                            .push((container_segment.to_string(), item_segment.clone()));
                        entry.1 += references;
                    }
                }

                let fetches = by_item
                    .into_iter()
                    .map(|(item_id, (aliases, references))| async move {
                        let item = limited(
                            semaphore,
                            cancel,
                            self.client.get_item(container_id, item_id, cancel),
                        )
                        .await?;
                        resolved.fetch_add(references, Ordering::SeqCst);
                        let key = (container_id.to_string(), item_id.to_string());
                        Ok::<_, Error>((key, aliases, item))
                    });
                try_join_all(fetches).await
            }
        });

        let fetched = try_join_all(per_container).await.map_err(|error| {
            cancel.cancel();
            error
        })?;

        let mut items = FetchedItems::default();
        for (key, aliases, item) in fetched.into_iter().flatten() {
            for alias in aliases {
                items.aliases.insert(alias, key.clone());
            }
            items.items.insert(key, item);
        }
        Ok(items)
    }
}

/// Items fetched for one batch, keyed by remote ids, plus the segment
/// spellings that led to each of them
#[derive(Default)]
struct FetchedItems {
    items: HashMap<ItemKey, Item>,
    aliases: HashMap<ItemKey, ItemKey>,
}

impl FetchedItems {
    fn get(&self, container_segment: &str, item_segment: &str) -> Option<&Item> {
        let ids = self
            .aliases
            .get(&(container_segment.to_string(), item_segment.to_string()))?;
        self.items.get(ids)
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Run `call` once a concurrency permit is free, unless the batch is cancelled first
async fn limited<T>(
    semaphore: &Semaphore,
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::cancelled("batch fetch")),
        permit = semaphore.acquire() => {
            permit.map_err(|_| Error::cancelled("batch fetch"))?
        }
    };
    call.await
}

/// Exact name first, then exact id
fn match_container<'a>(containers: &'a [Container], segment: &str) -> Option<&'a Container> {
    containers
        .iter()
        .find(|container| container.name == segment)
        .or_else(|| containers.iter().find(|container| container.id == segment))
}

/// Exact title first, then exact id
fn match_item<'a>(items: &'a [ItemSummary], segment: &str) -> Option<&'a ItemSummary> {
    items
        .iter()
        .find(|item| item.title == segment)
        .or_else(|| items.iter().find(|item| item.id == segment))
}
