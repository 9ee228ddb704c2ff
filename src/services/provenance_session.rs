//! Headless provenance session for library consumers
//!
//! `ProvenanceSession` wires the schema registry, a resource lister, the
//! provenance store, the refresh loop and the query engine together. This
//! is the primary entry point for using kubeprov as a library.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::schema::Config;
use crate::lister::{FixtureLister, KubeLister, ResourceLister};
use crate::query::{CompositionNode, QueryEngine, QueryError};
use crate::refresh::{CycleReport, RefreshLoop};
use crate::registry::{EtcdKeysClient, KeyValueStore};
use crate::schema::{
    CompositionSchema, FileSchemaSource, OperatorRegistrySource, SchemaError, SchemaRegistry,
    SchemaSource,
};
use crate::store::ProvenanceStore;

/// A provenance graph kept fresh against one cluster
///
/// # Example
///
/// ```rust,no_run
/// use kubeprov::services::ProvenanceSession;
/// use kubeprov::config::schema::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::default();
/// let session = ProvenanceSession::connect(&config).await?;
///
/// session.refresh_once().await;
/// println!("{}", session.query("deployments", "*")?);
/// # Ok(())
/// # }
/// ```
pub struct ProvenanceSession {
    registry: Arc<SchemaRegistry>,
    store: ProvenanceStore,
    refresh: Arc<RefreshLoop>,
    engine: QueryEngine,
    key_value: Option<Arc<dyn KeyValueStore>>,
    client: Option<kube::Client>,
    namespace: String,
}

impl ProvenanceSession {
    /// Connect using the given configuration
    ///
    /// Lists from the cluster through the default kubeconfig, or from
    /// `fixturesDir` when configured. Failing to build a cluster client is
    /// fatal.
    pub async fn connect(config: &Config) -> Result<Self> {
        let key_value: Arc<dyn KeyValueStore> = Arc::new(
            EtcdKeysClient::new(&config.registry_url)
                .context("Failed to create operator registry client")?,
        );

        let registry = Arc::new(Self::registry_for(config, key_value.clone()));

        let (lister, client, namespace) = match &config.fixtures_dir {
            Some(dir) => {
                tracing::info!("Listing resources from fixtures in {}", dir.display());
                let lister: Arc<dyn ResourceLister> = Arc::new(FixtureLister::from_dir(dir));
                (lister, None, config.namespace.clone())
            }
            None => {
                let client = crate::kube::create_client().await?;
                let namespace = crate::kube::resolve_namespace(&client, &config.namespace);
                if let Some(context) = crate::kube::get_context() {
                    tracing::info!("Using context {} namespace {}", context, namespace);
                }
                let lister: Arc<dyn ResourceLister> =
                    Arc::new(KubeLister::new(client.clone(), namespace.clone()));
                (lister, Some(client), namespace)
            }
        };

        let mut session = Self::from_parts(registry, lister, config);
        session.key_value = Some(key_value);
        session.client = client;
        session.namespace = namespace;
        Ok(session)
    }

    /// Build a session from already constructed parts
    ///
    /// No operator registry or cluster client is attached, so
    /// [`ProvenanceSession::openapi_spec`] is unavailable.
    pub fn from_parts(
        registry: Arc<SchemaRegistry>,
        lister: Arc<dyn ResourceLister>,
        config: &Config,
    ) -> Self {
        let store = ProvenanceStore::new();
        let refresh = RefreshLoop::new(registry.clone(), lister, store.clone())
            .with_interval(config.refresh_interval())
            .with_purge_match(config.purge_match);
        let engine = QueryEngine::new(store.clone(), registry.clone(), config.reconstruction);

        Self {
            registry,
            store,
            refresh: Arc::new(refresh),
            engine,
            key_value: None,
            client: None,
            namespace: config.namespace.clone(),
        }
    }

    /// Schema registry for `config`
    ///
    /// A composition file, when configured, is the only source; otherwise
    /// kinds are discovered from the operator registry.
    pub fn registry_for(config: &Config, key_value: Arc<dyn KeyValueStore>) -> SchemaRegistry {
        let initial = if config.builtin_kinds {
            CompositionSchema::builtin()
        } else {
            CompositionSchema::new()
        };

        let source: Box<dyn SchemaSource> = match &config.composition_file {
            Some(path) => Box::new(FileSchemaSource::new(path)),
            None => Box::new(OperatorRegistrySource::new(key_value)),
        };
        tracing::debug!("Schema source: {}", source.describe());

        SchemaRegistry::new(initial, source)
    }

    /// Start the refresh loop in the background
    pub fn spawn_refresh(&self) -> JoinHandle<()> {
        let refresh = self.refresh.clone();
        tokio::spawn(async move { refresh.run().await })
    }

    /// Run a single refresh cycle in place
    pub async fn refresh_once(&self) -> CycleReport {
        self.refresh.run_cycle().await
    }

    /// Reload the schema without refreshing the store
    pub async fn load_schema(&self) -> Result<usize, SchemaError> {
        self.registry.load().await
    }

    pub fn query(&self, kind: &str, name: &str) -> Result<String, QueryError> {
        self.engine.query(kind, name)
    }

    pub fn compositions(&self, kind: &str, name: &str) -> Vec<CompositionNode> {
        self.engine.compositions(kind, name)
    }

    pub fn dump(&self) -> String {
        self.store.dump()
    }

    pub fn schema(&self) -> CompositionSchema {
        self.registry.snapshot()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.registry.kinds()
    }

    pub fn store(&self) -> &ProvenanceStore {
        &self.store
    }

    /// OpenAPI specification registered for a custom kind
    pub async fn openapi_spec(&self, kind: &str) -> Result<String> {
        let (Some(key_value), Some(client)) = (&self.key_value, &self.client) else {
            anyhow::bail!("OpenAPI lookup needs the operator registry and a cluster connection");
        };
        crate::kube::fetch_openapi_spec(key_value.as_ref(), client, &self.namespace, kind)
            .await
            .with_context(|| format!("Failed to fetch OpenAPI spec for {}", kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Reconstruction;
    use crate::registry::MockKeyValueStore;
    use serde_json::json;

    fn fixture_session() -> ProvenanceSession {
        let lister = FixtureLister::new();
        lister.insert(
            "Deployment",
            json!({"items": [{"metadata": {"name": "web"}, "status": {"phase": "Active"}}]}),
        );
        lister.insert(
            "ReplicaSet",
            json!({"items": [{"metadata": {"name": "web-1", "ownerReferences": [{"kind": "Deployment", "name": "web"}]}}]}),
        );
        let registry = Arc::new(SchemaRegistry::fixed(CompositionSchema::builtin()));
        ProvenanceSession::from_parts(registry, Arc::new(lister), &Config::default())
    }

    #[tokio::test]
    async fn test_refresh_then_query() {
        let session = fixture_session();
        assert_eq!(session.query("Deployment", "web").unwrap(), "[]");

        let report = session.refresh_once().await;
        assert_eq!(report.records, 2);

        let nodes = session.compositions("deployments", "web");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].status, "Active");
        assert_eq!(nodes[0].children[0].name, "web-1");
        assert!(session.dump().contains("Kind: Deployment Name: web Composition:"));
    }

    #[tokio::test]
    async fn test_openapi_unavailable_without_cluster() {
        let session = fixture_session();
        assert!(session.openapi_spec("Postgres").await.is_err());
    }

    #[tokio::test]
    async fn test_spawned_refresh_populates_store() {
        let session = fixture_session();
        let handle = session.spawn_refresh();
        for _ in 0..50 {
            if !session.store().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(session.store().len(), 2);
    }

    #[test]
    fn test_registry_for_selects_source() {
        let key_value: Arc<dyn KeyValueStore> = Arc::new(MockKeyValueStore::new());

        let from_file = Config {
            composition_file: Some("/etc/kubeprov/composition.yaml".into()),
            builtin_kinds: false,
            reconstruction: Reconstruction::LevelHeuristic,
            ..Config::default()
        };
        let registry = ProvenanceSession::registry_for(&from_file, key_value.clone());
        assert!(registry.source_description().starts_with("file"));
        assert!(registry.kinds().is_empty());

        let registry = ProvenanceSession::registry_for(&Config::default(), key_value);
        assert_eq!(registry.source_description(), "operator registry");
        assert_eq!(registry.kinds().len(), 7);
    }
}
