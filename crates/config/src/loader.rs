//! Configuration loader for vaultlink
//!
//! [`ConfigLoader`] reads registered sources into a [`LayeredConfiguration`]
//! in registration order and, when a [`SecretsProvider`] is attached, resolves
//! secret references into a [`ConfigurationSnapshot`].

use crate::layers::LayeredConfiguration;
use crate::provider::{ConfigurationSnapshot, SecretsProvider};
use crate::sources::{EnvironmentSource, JsonFileSource, LayerSource, MemorySource};
use std::path::PathBuf;
use std::sync::Arc;
use vaultlink_core::{CancellationToken, Error, Result};
use vaultlink_secrets::{resolver_from_config, ClientConfig};

/// Builder that turns layer sources into a loaded configuration
#[derive(Default)]
pub struct ConfigLoader {
    /// Sources in precedence order, lowest first
    sources: Vec<Box<dyn LayerSource>>,
    /// Resolves references after layering
    secrets: Option<SecretsProvider>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source above every source added so far
    pub fn source(mut self, source: impl LayerSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Register fixed in-memory values
    pub fn memory<I, K, V>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.source(MemorySource::new(name, values))
    }

    /// Register a JSON file; optional files may be missing
    pub fn json_file(self, path: impl Into<PathBuf>, optional: bool) -> Self {
        self.source(JsonFileSource::new(path).optional(optional))
    }

    /// Register environment variables starting with `prefix`
    pub fn environment(self, prefix: impl Into<String>) -> Self {
        self.source(EnvironmentSource::new().with_prefix(prefix))
    }

    /// Resolve secret references with `provider`
    pub fn secrets(mut self, provider: SecretsProvider) -> Self {
        self.secrets = Some(provider);
        self
    }

    /// Resolve secret references against the remote store described by
    /// `config`
    pub fn remote_secrets(self, config: &ClientConfig) -> Result<Self> {
        let resolver = resolver_from_config(config)?;
        Ok(self.secrets(SecretsProvider::new(Arc::new(resolver))))
    }

    /// Read every source into layers without resolving anything
    pub fn layers(&self) -> Result<LayeredConfiguration> {
        let mut layered = LayeredConfiguration::new();
        for source in &self.sources {
            let layer = source.load().map_err(|e| match e {
                Error::Configuration { message } => Error::configuration(format!(
                    "loading layer '{}': {message}",
                    source.name()
                )),
                other => other,
            })?;
            layered.add_layer(layer);
        }
        Ok(layered)
    }

    /// Load all sources and resolve secrets.
    ///
    /// Without a secrets provider reference values are returned unchanged.
    pub async fn load(self, cancel: &CancellationToken) -> Result<ConfigurationSnapshot> {
        let layered = self.layers()?;
        tracing::debug!(layers = layered.len(), "Configuration layers read");

        match self.secrets {
            Some(provider) => provider.load(&layered, cancel).await,
            None => Ok(ConfigurationSnapshot::unresolved(layered.flatten())),
        }
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("secrets", &self.secrets)
            .finish()
    }
}
