//! HTTPS transport for the secret store REST API

use super::transport::SecretStoreTransport;
use crate::settings::ClientConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;
use vaultlink_core::{Container, Error, Item, ItemSummary, Result};
use zeroize::Zeroizing;

/// Transport speaking JSON over HTTPS with a bearer token.
///
/// One `reqwest::Client` is built per transport and reused for every call,
/// so connections are pooled for the transport's lifetime.
pub struct HttpTransport {
    base_url: Url,
    endpoint: String,
    token: Zeroizing<String>,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the transport, rejecting insecure base URLs before any call is made
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.parsed_base_url()?;
        if config.token().trim().is_empty() {
            return Err(Error::configuration("service account token is empty"));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.attempt_timeout())
            .user_agent(concat!("vaultlink/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: base_url.as_str().trim_end_matches('/').to_string(),
            base_url,
            token: Zeroizing::new(config.token().to_string()),
            client,
        })
    }

    /// `base_url` + `v1/vaults/...`, each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::configuration(format!("base URL '{}' cannot carry a path", self.endpoint))
            })?
            .pop_if_empty()
            .push("v1")
            .push("vaults")
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        resource: &str,
        not_found: impl FnOnce() -> Error,
    ) -> Result<T> {
        tracing::trace!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.as_str())
            .send()
            .await
            .map_err(|e| Error::network(&self.endpoint, e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => return Err(Error::authentication_failure(&self.endpoint)),
            StatusCode::FORBIDDEN => return Err(Error::access_denied(resource)),
            StatusCode::NOT_FOUND => return Err(not_found()),
            status => return Err(Error::http(&self.endpoint, status.as_u16())),
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::network(&self.endpoint, e.to_string()))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl SecretStoreTransport for HttpTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        let url = self.url(&[])?;
        let endpoint = self.endpoint.clone();
        self.get_json(url, "vaults", || Error::http(endpoint, 404))
            .await
    }

    async fn get_container(&self, container_id: &str) -> Result<Container> {
        let url = self.url(&[container_id])?;
        self.get_json(url, &format!("vault {container_id}"), || {
            Error::container_not_found(container_id)
        })
        .await
    }

    async fn list_items(&self, container_id: &str) -> Result<Vec<ItemSummary>> {
        let url = self.url(&[container_id, "items"])?;
        self.get_json(url, &format!("vault {container_id}"), || {
            Error::container_not_found(container_id)
        })
        .await
    }

    async fn get_item(&self, container_id: &str, item_id: &str) -> Result<Item> {
        let url = self.url(&[container_id, "items", item_id])?;
        self.get_json(
            url,
            &format!("item {item_id} in vault {container_id}"),
            || Error::item_not_found(container_id, item_id),
        )
        .await
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_http_rejected_at_construction() {
        let config = ClientConfig::new("http://vault.example.com", "token");
        let err = HttpTransport::new(&config).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_urls_percent_encode_ids() {
        let config = ClientConfig::new("https://vault.example.com/api/", "token");
        let transport = HttpTransport::new(&config).unwrap();

        let url = transport.url(&["my vault", "items", "a/b"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://vault.example.com/api/v1/vaults/my%20vault/items/a%2Fb"
        );
        assert_eq!(transport.endpoint(), "https://vault.example.com/api");
    }

    #[test]
    fn test_debug_hides_token() {
        let config = ClientConfig::new("https://vault.example.com", "super_secret");
        let transport = HttpTransport::new(&config).unwrap();
        assert!(!format!("{transport:?}").contains("super_secret"));
    }
}
