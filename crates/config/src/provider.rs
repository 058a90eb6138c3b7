//! Secrets provider
//!
//! [`SecretsProvider`] turns a [`LayeredConfiguration`] into a
//! [`ConfigurationSnapshot`] in which every key whose final value is a secret
//! reference has been replaced by the resolved secret.
//!
//! A provider loads exactly once:
//!
//! ```text
//! Constructed --load()--> Loading --ok--> Loaded
//!                                 \--err-> Failed
//! ```
//!
//! Loaded and Failed are terminal. A second `load` on the same provider is a
//! configuration error whatever the outcome of the first.

use crate::layers::{FlattenedView, LayeredConfiguration};
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use vaultlink_core::{CancellationToken, Error, ReferenceSyntax, Result};
use vaultlink_secrets::SecretResolver;
use zeroize::Zeroizing;

/// Lifecycle of a [`SecretsProvider`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Constructed,
    Loading,
    Loaded,
    Failed,
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderState::Constructed => "constructed",
            ProviderState::Loading => "loading",
            ProviderState::Loaded => "loaded",
            ProviderState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Resolves secret references found in layered configuration
pub struct SecretsProvider {
    resolver: Arc<dyn SecretResolver>,
    syntax: ReferenceSyntax,
    state: Mutex<ProviderState>,
}

impl SecretsProvider {
    /// Create a provider that recognises `op://` references
    pub fn new(resolver: Arc<dyn SecretResolver>) -> Self {
        Self {
            resolver,
            syntax: ReferenceSyntax::default(),
            state: Mutex::new(ProviderState::Constructed),
        }
    }

    /// Recognise references with a different scheme.
    ///
    /// Must agree with the syntax the resolver parses with, otherwise every
    /// collected value is rejected as malformed.
    pub fn with_syntax(mut self, syntax: ReferenceSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn state(&self) -> ProviderState {
        *self.state.lock()
    }

    pub fn syntax(&self) -> &ReferenceSyntax {
        &self.syntax
    }

    /// Resolve every reference in `layered` and return the merged snapshot.
    ///
    /// Only keys whose final, precedence-applied value is a reference are
    /// collected; a key overridden by a plain value in a higher layer is never
    /// sent to the resolver. The resolver is called at most once, with
    /// duplicate references removed. Any failure fails the whole load.
    pub async fn load(
        &self,
        layered: &LayeredConfiguration,
        cancel: &CancellationToken,
    ) -> Result<ConfigurationSnapshot> {
        let mut guard = self.begin()?;
        let snapshot = self.load_inner(layered, cancel).await;
        match &snapshot {
            Ok(snapshot) => {
                guard.finish(ProviderState::Loaded);
                tracing::info!(
                    keys = snapshot.len(),
                    resolved = snapshot.resolved_count(),
                    "Configuration loaded"
                );
            }
            Err(e) => {
                guard.finish(ProviderState::Failed);
                tracing::warn!(error = %e, "Configuration load failed");
            }
        }
        snapshot
    }

    fn begin(&self) -> Result<LoadGuard<'_>> {
        let mut state = self.state.lock();
        if *state != ProviderState::Constructed {
            return Err(Error::configuration(format!(
                "secrets provider is already {}; a provider loads only once",
                *state
            )));
        }
        *state = ProviderState::Loading;
        Ok(LoadGuard {
            state: &self.state,
            finished: false,
        })
    }

    async fn load_inner(
        &self,
        layered: &LayeredConfiguration,
        cancel: &CancellationToken,
    ) -> Result<ConfigurationSnapshot> {
        let view = layered.flatten();
        let pending = self.collect_references(&view);

        if pending.is_empty() {
            tracing::debug!("No secret references in configuration");
            return Ok(ConfigurationSnapshot::unresolved(view));
        }

        let references: Vec<String> = pending
            .values()
            .cloned()
            .collect::<IndexSet<String>>()
            .into_iter()
            .collect();
        tracing::debug!(
            keys = pending.len(),
            references = references.len(),
            "Resolving configuration secrets"
        );

        let result = self.resolver.resolve(&references, cancel).await?;

        let mut resolved = IndexMap::with_capacity(pending.len());
        for (key, reference) in pending {
            let value = result.get(&reference).ok_or_else(|| {
                Error::configuration(format!(
                    "resolver returned no value for '{reference}' (key '{key}')"
                ))
            })?;
            resolved.insert(key, Zeroizing::new(value.to_string()));
        }
        Ok(ConfigurationSnapshot::new(view, resolved))
    }

    /// Keys whose final value is a reference, mapped to that reference
    fn collect_references(&self, view: &FlattenedView) -> IndexMap<String, String> {
        view.iter()
            .filter(|(_, entry)| self.syntax.matches(&entry.value))
            .map(|(key, entry)| (key.to_string(), entry.value.clone()))
            .collect()
    }
}

impl fmt::Debug for SecretsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsProvider")
            .field("syntax", &self.syntax)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Moves the provider out of Loading even if the load future is dropped
struct LoadGuard<'a> {
    state: &'a Mutex<ProviderState>,
    finished: bool,
}

impl LoadGuard<'_> {
    fn finish(&mut self, outcome: ProviderState) {
        *self.state.lock() = outcome;
        self.finished = true;
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state.lock() = ProviderState::Failed;
        }
    }
}

/// Merged configuration with secrets resolved.
///
/// Lookups return the resolved secret for keys that held a reference and the
/// layered value for everything else. `Debug` never prints values.
#[derive(Clone)]
pub struct ConfigurationSnapshot {
    view: FlattenedView,
    resolved: IndexMap<String, Zeroizing<String>>,
}

impl ConfigurationSnapshot {
    fn new(view: FlattenedView, resolved: IndexMap<String, Zeroizing<String>>) -> Self {
        Self { view, resolved }
    }

    pub(crate) fn unresolved(view: FlattenedView) -> Self {
        Self::new(view, IndexMap::new())
    }

    /// Final value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.resolved.get(key) {
            Some(secret) => Some(secret.as_str()),
            None => self.view.get(key),
        }
    }

    /// Whether `key` held a reference that was resolved
    pub fn is_resolved(&self, key: &str) -> bool {
        self.resolved.contains_key(key)
    }

    /// Name of the layer that supplied `key`
    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.view.source_of(key)
    }

    /// Every key with `prefix:` in front, e.g. all `Database` settings
    pub fn section<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.keys().filter_map(move |key| {
            let rest = key.strip_prefix(prefix)?;
            let child = rest.strip_prefix(vaultlink_core::KEY_SEPARATOR)?;
            Some((child, self.get(key)?))
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.view.keys()
    }

    pub fn resolved_keys(&self) -> impl Iterator<Item = &str> {
        self.resolved.keys().map(String::as_str)
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }
}

impl fmt::Debug for ConfigurationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationSnapshot")
            .field("keys", &self.view.keys().collect::<Vec<_>>())
            .field("resolved", &self.resolved.keys().collect::<Vec<_>>())
            .finish()
    }
}
