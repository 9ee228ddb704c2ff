//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server and the OpenAPI
//! specification lookup for custom kinds.

mod openapi;

pub use openapi::{
    OPENAPI_SPEC_FIELD, OpenApiError, config_map_name, fetch_openapi_spec, openapi_key,
    spec_from_config_map,
};

use anyhow::{Context, Result};
use kube::config::Kubeconfig;
use kube::{Client, Config};

/// Initialize and return a Kubernetes client
///
/// Uses the default kubeconfig loading strategy:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
///
/// Missing credentials are fatal: nothing can be listed without them.
pub async fn create_client() -> Result<Client> {
    let config = Config::infer()
        .await
        .context("Failed to load Kubernetes configuration")?;
    tracing::debug!("Connecting to cluster at {}", config.cluster_url);

    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    Ok(client)
}

/// Get the current Kubernetes context name, if a kubeconfig is present
pub fn get_context() -> Option<String> {
    Kubeconfig::read()
        .ok()
        .and_then(|kubeconfig| kubeconfig.current_context)
}

/// Namespace to list in: the configured one, or the client's default
pub fn resolve_namespace(client: &Client, configured: &str) -> String {
    if configured.is_empty() {
        client.default_namespace().to_string()
    } else {
        configured.to_string()
    }
}
