//! OpenAPI specification lookup for custom kinds
//!
//! The registry maps `/<Kind>-OpenAPISpecConfigMap` to the name of a
//! ConfigMap (stored as a JSON string); that ConfigMap carries the
//! specification under its `openapispec` data key.

use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};

use crate::registry::{KeyValueStore, RegistryError};

/// ConfigMap data key holding the specification
pub const OPENAPI_SPEC_FIELD: &str = "openapispec";

#[derive(Debug, thiserror::Error)]
pub enum OpenApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("registry value for {key} is not a ConfigMap name: {reason}")]
    InvalidName { key: String, reason: String },

    #[error("failed to fetch ConfigMap {name}: {source}")]
    Api {
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("ConfigMap {name} has no 'openapispec' entry")]
    MissingSpec { name: String },
}

/// Registry key naming the ConfigMap of `kind`
pub fn openapi_key(kind: &str) -> String {
    format!("/{}-OpenAPISpecConfigMap", kind)
}

/// Look up the ConfigMap name registered for `kind`
pub async fn config_map_name(store: &dyn KeyValueStore, kind: &str) -> Result<String, OpenApiError> {
    let key = openapi_key(kind);
    let raw = store.get(&key).await?;
    serde_json::from_str::<String>(&raw).map_err(|e| OpenApiError::InvalidName {
        key,
        reason: e.to_string(),
    })
}

/// The specification stored in a ConfigMap
pub fn spec_from_config_map(config_map: &ConfigMap) -> Result<String, OpenApiError> {
    config_map
        .data
        .as_ref()
        .and_then(|data| data.get(OPENAPI_SPEC_FIELD))
        .cloned()
        .ok_or_else(|| OpenApiError::MissingSpec {
            name: config_map.metadata.name.clone().unwrap_or_default(),
        })
}

/// Fetch the OpenAPI specification of a custom kind
pub async fn fetch_openapi_spec(
    store: &dyn KeyValueStore,
    client: &Client,
    namespace: &str,
    kind: &str,
) -> Result<String, OpenApiError> {
    let name = config_map_name(store, kind).await?;
    tracing::debug!("OpenAPI spec of {} is in ConfigMap {}/{}", kind, namespace, name);

    let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let config_map = api
        .get(&name)
        .await
        .map_err(|source| OpenApiError::Api {
            name: name.clone(),
            source,
        })?;
    spec_from_config_map(&config_map)
}
