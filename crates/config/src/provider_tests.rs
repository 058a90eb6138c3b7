//! Tests for the secrets provider

use crate::layers::{ConfigurationLayer, LayeredConfiguration};
use crate::provider::{ProviderState, SecretsProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use vaultlink_core::{CancellationToken, Error, ReferenceSyntax, Result};
use vaultlink_secrets::{ResolutionResult, SecretResolver};

/// Resolver double that records every batch it receives
#[derive(Default)]
struct RecordingResolver {
    secrets: HashMap<String, String>,
    batches: Mutex<Vec<Vec<String>>>,
    failure: Option<fn() -> Error>,
    latency: Option<Duration>,
}

impl RecordingResolver {
    fn with_secrets(pairs: &[(&str, &str)]) -> Self {
        Self {
            secrets: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl SecretResolver for RecordingResolver {
    async fn resolve(
        &self,
        references: &[String],
        cancel: &CancellationToken,
    ) -> Result<ResolutionResult> {
        self.batches.lock().push(references.to_vec());
        if let Some(latency) = self.latency {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::cancelled("resolve")),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        Ok(references
            .iter()
            .filter_map(|r| Some((r.clone(), self.secrets.get(r)?.clone())))
            .collect())
    }
}

fn layered() -> LayeredConfiguration {
    LayeredConfiguration::new()
        .with_layer(
            ConfigurationLayer::new("appsettings")
                .with("Database:Host", "localhost")
                .with("Database:Password", "op://infra/db/password")
                .with("Api:Key", "op://infra/api/key")
                .with("Api:Fallback", "op://infra/api/key")
                .with("Smtp:Password", "op://infra/smtp/password"),
        )
        .with_layer(ConfigurationLayer::new("overrides").with("Smtp:Password", "dev-only"))
}

fn resolver() -> Arc<RecordingResolver> {
    Arc::new(RecordingResolver::with_secrets(&[
        ("op://infra/db/password", "s3cret"),
        ("op://infra/api/key", "key-123"),
        ("op://infra/smtp/password", "never-used"),
    ]))
}

#[tokio::test]
async fn test_load_overlays_resolved_values() {
    let resolver = resolver();
    let provider = SecretsProvider::new(resolver.clone());

    let snapshot = provider
        .load(&layered(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(provider.state(), ProviderState::Loaded);
    assert_eq!(snapshot.get("Database:Password"), Some("s3cret"));
    assert_eq!(snapshot.get("Api:Key"), Some("key-123"));
    assert_eq!(snapshot.get("Api:Fallback"), Some("key-123"));
    assert_eq!(snapshot.get("Database:Host"), Some("localhost"));
    assert!(snapshot.is_resolved("Api:Key"));
    assert!(!snapshot.is_resolved("Database:Host"));
    assert_eq!(snapshot.get("Missing"), None);
}

#[tokio::test]
async fn test_overridden_reference_is_never_resolved() {
    let resolver = resolver();
    let provider = SecretsProvider::new(resolver.clone());

    let snapshot = provider
        .load(&layered(), &CancellationToken::new())
        .await
        .unwrap();

    let batches = resolver.batches();
    assert_eq!(batches.len(), 1);
    assert!(!batches[0].contains(&"op://infra/smtp/password".to_string()));
    assert_eq!(snapshot.get("Smtp:Password"), Some("dev-only"));
    assert_eq!(snapshot.source_of("Smtp:Password"), Some("overrides"));
}

#[tokio::test]
async fn test_references_are_deduplicated_into_one_batch() {
    let resolver = resolver();
    let provider = SecretsProvider::new(resolver.clone());

    provider
        .load(&layered(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        resolver.batches(),
        vec![vec![
            "op://infra/db/password".to_string(),
            "op://infra/api/key".to_string(),
        ]]
    );
}

#[tokio::test]
async fn test_higher_layer_reference_replaces_plain_value() {
    let resolver = resolver();
    let provider = SecretsProvider::new(resolver.clone());
    let layered = LayeredConfiguration::new()
        .with_layer(ConfigurationLayer::new("defaults").with("Database:Password", "changeme"))
        .with_layer(
            ConfigurationLayer::new("production").with("Database:Password", "op://infra/db/password"),
        );

    let snapshot = provider
        .load(&layered, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(snapshot.get("Database:Password"), Some("s3cret"));
}

#[tokio::test]
async fn test_no_references_skips_resolver() {
    let resolver = resolver();
    let provider = SecretsProvider::new(resolver.clone());
    let layered = LayeredConfiguration::new()
        .with_layer(ConfigurationLayer::new("defaults").with("Logging:Level", "info"));

    let snapshot = provider
        .load(&layered, &CancellationToken::new())
        .await
        .unwrap();

    assert!(resolver.batches().is_empty());
    assert_eq!(snapshot.resolved_count(), 0);
    assert_eq!(provider.state(), ProviderState::Loaded);
}

#[tokio::test]
async fn test_load_is_one_shot() {
    let provider = SecretsProvider::new(resolver());
    let cancel = CancellationToken::new();

    provider.load(&layered(), &cancel).await.unwrap();
    let err = provider.load(&layered(), &cancel).await.unwrap_err();

    assert!(matches!(err, Error::Configuration { message } if message.contains("already loaded")));
    assert_eq!(provider.state(), ProviderState::Loaded);
}

#[tokio::test]
async fn test_resolution_error_fails_load() {
    let resolver = Arc::new(RecordingResolver {
        failure: Some(|| Error::authentication_failure("https://vault.example.com")),
        ..RecordingResolver::default()
    });
    let provider = SecretsProvider::new(resolver);
    let cancel = CancellationToken::new();

    let err = provider.load(&layered(), &cancel).await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailure { .. }));
    assert_eq!(provider.state(), ProviderState::Failed);

    let again = provider.load(&layered(), &cancel).await.unwrap_err();
    assert!(matches!(again, Error::Configuration { message } if message.contains("already failed")));
}

#[tokio::test]
async fn test_missing_value_in_result_fails_load() {
    let resolver = Arc::new(RecordingResolver::with_secrets(&[(
        "op://infra/db/password",
        "s3cret",
    )]));
    let provider = SecretsProvider::new(resolver);

    let err = provider
        .load(&layered(), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        Error::Configuration { message } => {
            assert!(message.contains("op://infra/api/key"));
            assert!(message.contains("Api:Key"));
        }
        other => panic!("expected Configuration, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropped_load_leaves_provider_failed() {
    let resolver = Arc::new(RecordingResolver {
        latency: Some(Duration::from_secs(60)),
        ..RecordingResolver::with_secrets(&[])
    });
    let provider = SecretsProvider::new(resolver);
    let layered = layered();
    let cancel = CancellationToken::new();

    let outcome =
        tokio::time::timeout(Duration::from_secs(1), provider.load(&layered, &cancel)).await;

    assert!(outcome.is_err());
    assert_eq!(provider.state(), ProviderState::Failed);
}

#[tokio::test]
async fn test_custom_scheme() {
    let resolver = Arc::new(RecordingResolver::with_secrets(&[("vault://a/b/c", "v")]));
    let provider = SecretsProvider::new(resolver.clone()).with_syntax(ReferenceSyntax::new("vault"));
    let layered = LayeredConfiguration::new().with_layer(
        ConfigurationLayer::new("defaults")
            .with("A", "vault://a/b/c")
            .with("B", "op://infra/db/password"),
    );

    let snapshot = provider
        .load(&layered, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(snapshot.get("A"), Some("v"));
    assert_eq!(snapshot.get("B"), Some("op://infra/db/password"));
    assert_eq!(resolver.batches(), vec![vec!["vault://a/b/c".to_string()]]);
}

#[tokio::test]
async fn test_snapshot_debug_and_sections() {
    let provider = SecretsProvider::new(resolver());
    let snapshot = provider
        .load(&layered(), &CancellationToken::new())
        .await
        .unwrap();

    let debug = format!("{snapshot:?}");
    assert!(debug.contains("Database:Password"));
    assert!(!debug.contains("s3cret"));
    assert!(!debug.contains("key-123"));

    let database: Vec<(&str, &str)> = snapshot.section("Database").collect();
    assert_eq!(database, vec![("Host", "localhost"), ("Password", "s3cret")]);
}
