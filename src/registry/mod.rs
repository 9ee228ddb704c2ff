//! Operator registry client
//!
//! The operator registry is a key/value service (etcd v2 keys API) holding
//! path-like keys such as `/operators` and `/<name>` whose values are JSON
//! documents. Schema discovery and the OpenAPI accessor both read from it.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Errors returned by the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid registry URL '{0}'")]
    InvalidUrl(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("registry request for {key} failed: {source}")]
    Request {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("registry returned {status} for {key}")]
    Status { key: String, status: u16 },
}

/// Read-only access to string values stored under path-like keys
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<String, RegistryError>;
}

#[derive(Debug, Deserialize)]
struct KeysResponse {
    node: KeysNode,
}

#[derive(Debug, Deserialize)]
struct KeysNode {
    #[serde(default)]
    value: Option<String>,
}

/// Client for the etcd v2 keys HTTP API
pub struct EtcdKeysClient {
    client: reqwest::Client,
    base: Url,
}

impl EtcdKeysClient {
    pub fn new(base_url: &str) -> Result<Self, RegistryError> {
        let mut base =
            Url::parse(base_url).map_err(|_| RegistryError::InvalidUrl(base_url.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|source| RegistryError::Request {
                key: String::new(),
                source,
            })?;

        tracing::debug!("Created registry client for: {}", base);

        Ok(Self { client, base })
    }

    /// URL of the keys API entry for `key`
    pub fn key_url(&self, key: &str) -> Result<Url, RegistryError> {
        self.base
            .join(&format!("v2/keys/{}", key.trim_start_matches('/')))
            .map_err(|_| RegistryError::InvalidUrl(format!("{}{}", self.base, key)))
    }
}

#[async_trait]
impl KeyValueStore for EtcdKeysClient {
    async fn get(&self, key: &str) -> Result<String, RegistryError> {
        let url = self.key_url(key)?;
        tracing::debug!("Fetching registry key: {}", url);

        let request_error = |source: reqwest::Error| RegistryError::Request {
            key: key.to_string(),
            source,
        };

        let resp = self.client.get(url).send().await.map_err(request_error)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(key.to_string()));
        }
        if !resp.status().is_success() {
            return Err(RegistryError::Status {
                key: key.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body: KeysResponse = resp.json().await.map_err(request_error)?;
        body.node
            .value
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }
}
