//! Layered configuration
//!
//! A [`LayeredConfiguration`] is an ordered stack of [`ConfigurationLayer`]s.
//! Layers are kept in registration order and a later layer overrides an
//! earlier one for the same key. [`LayeredConfiguration::flatten`] collapses
//! the stack into a [`FlattenedView`] that remembers which layer supplied each
//! final value.

use indexmap::IndexMap;
use std::fmt;

/// A named snapshot of raw key/value pairs from a single source
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConfigurationLayer {
    name: String,
    values: IndexMap<String, String>,
}

impl ConfigurationLayer {
    /// Create an empty layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: IndexMap::new(),
        }
    }

    /// Add a value and return the layer, for building layers inline
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, returning the one it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

// Raw layer values can hold anything, including plaintext secrets
impl fmt::Debug for ConfigurationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationLayer")
            .field("name", &self.name)
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The winning value for a key together with where it came from
#[derive(Clone, PartialEq, Eq)]
pub struct FlattenedValue {
    /// Final raw value after precedence is applied
    pub value: String,
    /// Name of the layer that supplied `value`
    pub layer: String,
    /// Position of that layer in registration order
    pub layer_index: usize,
}

impl fmt::Debug for FlattenedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlattenedValue")
            .field("layer", &self.layer)
            .field("layer_index", &self.layer_index)
            .finish_non_exhaustive()
    }
}

/// Result of collapsing a layer stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedView {
    entries: IndexMap<String, FlattenedValue>,
}

impl FlattenedView {
    /// Final value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|entry| entry.value.as_str())
    }

    /// Full entry for `key`, including its source layer
    pub fn entry(&self, key: &str) -> Option<&FlattenedValue> {
        self.entries.get(key)
    }

    /// Name of the layer whose value won for `key`
    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|entry| entry.layer.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in the order they were first seen, lowest layer first
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlattenedValue)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }
}

/// Ordered stack of configuration layers, lowest precedence first
#[derive(Debug, Clone, Default)]
pub struct LayeredConfiguration {
    layers: Vec<ConfigurationLayer>,
}

impl LayeredConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer above every layer added so far
    pub fn add_layer(&mut self, layer: ConfigurationLayer) -> &mut Self {
        tracing::trace!(layer = %layer.name(), keys = layer.len(), "Registered configuration layer");
        self.layers.push(layer);
        self
    }

    /// Builder form of [`add_layer`](Self::add_layer)
    pub fn with_layer(mut self, layer: ConfigurationLayer) -> Self {
        self.add_layer(layer);
        self
    }

    pub fn layers(&self) -> &[ConfigurationLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Final value for `key` without building the full view
    pub fn get(&self, key: &str) -> Option<&str> {
        self.layers.iter().rev().find_map(|layer| layer.get(key))
    }

    /// Collapse the stack so each key holds the value of the highest layer
    /// that defines it
    pub fn flatten(&self) -> FlattenedView {
        let mut entries: IndexMap<String, FlattenedValue> = IndexMap::new();
        for (layer_index, layer) in self.layers.iter().enumerate() {
            for (key, value) in layer.iter() {
                entries.insert(
                    key.to_string(),
                    FlattenedValue {
                        value: value.to_string(),
                        layer: layer.name().to_string(),
                        layer_index,
                    },
                );
            }
        }
        FlattenedView { entries }
    }
}
