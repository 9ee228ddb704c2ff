//! Kubernetes API lister
//!
//! Lists arbitrary kinds through the dynamic API, so kinds declared only in
//! the composition schema (custom resources included) need no compiled type.

use async_trait::async_trait;
use kube::Client;
use kube::api::{Api, ApiResource, DynamicObject, ListParams};

use super::{ListError, ResourceLister, ResourceSnapshot, snapshot_from_item};
use crate::schema::KindSpec;

/// Where a kind is listed from, derived from its schema endpoint
///
/// Endpoints have the form `api/<version>` (core group) or
/// `apis/<group>/<version>`. An endpoint that already ends with the plural
/// name denotes a cluster-scoped kind, listed across the whole cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTarget {
    pub group: String,
    pub version: String,
    pub cluster_scoped: bool,
}

impl ListTarget {
    pub fn parse(kind: &str, endpoint: &str, plural: &str) -> Result<Self, ListError> {
        let invalid = |reason: &str| ListError::InvalidEndpoint {
            kind: kind.to_string(),
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        let mut segments: Vec<&str> = endpoint.split('/').filter(|s| !s.is_empty()).collect();

        let cluster_scoped = !plural.is_empty() && segments.last() == Some(&plural);
        if cluster_scoped {
            segments.pop();
        }

        let (group, version) = match segments.as_slice() {
            ["api", version] => (String::new(), (*version).to_string()),
            ["apis", group, version] => ((*group).to_string(), (*version).to_string()),
            _ => return Err(invalid("expected api/<version> or apis/<group>/<version>")),
        };

        Ok(Self {
            group,
            version,
            cluster_scoped,
        })
    }

    /// Build the dynamic API resource for a kind at this target
    pub fn api_resource(&self, kind: &str, plural: &str) -> ApiResource {
        let api_version = if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        };
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version,
            kind: kind.to_string(),
            plural: plural.to_string(),
        }
    }
}

/// Lists resources from the Kubernetes API server
pub struct KubeLister {
    client: Client,
    namespace: String,
}

impl KubeLister {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl ResourceLister for KubeLister {
    async fn list(&self, kind: &str, spec: &KindSpec) -> Result<Vec<ResourceSnapshot>, ListError> {
        let target = ListTarget::parse(kind, &spec.endpoint, &spec.plural)?;
        let api_resource = target.api_resource(kind, &spec.plural);

        let api: Api<DynamicObject> = if target.cluster_scoped {
            Api::all_with(self.client.clone(), &api_resource)
        } else {
            Api::namespaced_with(self.client.clone(), &self.namespace, &api_resource)
        };

        tracing::debug!(
            "Listing {} ({}, cluster_scoped={})",
            kind,
            api_resource.api_version,
            target.cluster_scoped
        );

        let objects = api
            .list(&ListParams::default())
            .await
            .map_err(|source| ListError::Api {
                kind: kind.to_string(),
                source,
            })?;

        let mut snapshots = Vec::with_capacity(objects.items.len());
        for obj in &objects.items {
            match serde_json::to_value(obj) {
                Ok(value) => snapshots.extend(snapshot_from_item(kind, &value)),
                Err(e) => tracing::warn!("Failed to serialize {} object: {}", kind, e),
            }
        }

        tracing::debug!("Listed {} {} instance(s)", snapshots.len(), kind);
        Ok(snapshots)
    }

    fn lister_type(&self) -> &str {
        "kubernetes"
    }
}
