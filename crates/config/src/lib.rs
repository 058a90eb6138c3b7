//! Layered configuration with secret resolution for vaultlink
//!
//! Configuration is read from ordered sources (memory, JSON files, the
//! environment). Later sources override earlier ones. Any key whose final
//! value is a secret reference is resolved in one batch by a
//! [`SecretsProvider`].
//!
//! ```no_run
//! use vaultlink_config::ConfigLoader;
//! use vaultlink_core::CancellationToken;
//! use vaultlink_secrets::ClientConfig;
//!
//! # async fn run() -> vaultlink_core::Result<()> {
//! let snapshot = ConfigLoader::new()
//!     .json_file("appsettings.json", false)
//!     .json_file("appsettings.local.json", true)
//!     .environment("APP_")
//!     .remote_secrets(&ClientConfig::from_env()?)?
//!     .load(&CancellationToken::new())
//!     .await?;
//!
//! let password = snapshot.get("Database:Password");
//! # Ok(())
//! # }
//! ```

pub mod layers;
pub mod loader;
pub mod provider;
pub mod sources;

#[cfg(test)]
mod provider_tests;

pub use layers::{ConfigurationLayer, FlattenedValue, FlattenedView, LayeredConfiguration};
pub use loader::ConfigLoader;
pub use provider::{ConfigurationSnapshot, ProviderState, SecretsProvider};
pub use sources::{EnvironmentSource, JsonFileSource, LayerSource, MemorySource};
