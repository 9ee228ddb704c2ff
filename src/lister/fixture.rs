//! Fixture lister (offline mode and tests)

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use super::{ListError, ResourceLister, ResourceSnapshot, parse_list, parse_list_bytes};
use crate::schema::KindSpec;

/// Serves list documents without a cluster
///
/// Documents registered in memory take precedence. Otherwise, when a
/// directory is configured, `<dir>/<plural>.json` is read. A kind with no
/// document has no instances.
#[derive(Default)]
pub struct FixtureLister {
    documents: RwLock<HashMap<String, Value>>,
    unavailable: RwLock<HashSet<String>>,
    dir: Option<PathBuf>,
    calls: AtomicUsize,
}

impl FixtureLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read list documents from `<dir>/<plural>.json`
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Register (or replace) the list document for a kind
    pub fn insert(&self, kind: impl Into<String>, document: Value) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind.into(), document);
    }

    /// Forget the list document for a kind
    pub fn remove(&self, kind: &str) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(kind);
    }

    /// Make listing a kind fail until [`FixtureLister::restore`] is called
    pub fn mark_unavailable(&self, kind: impl Into<String>) {
        self.unavailable
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind.into());
    }

    pub fn restore(&self, kind: &str) {
        self.unavailable
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(kind);
    }

    /// Number of list calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn read_dir_document(
        &self,
        kind: &str,
        spec: &KindSpec,
    ) -> Result<Vec<ResourceSnapshot>, ListError> {
        let Some(dir) = &self.dir else {
            return Ok(Vec::new());
        };

        let path = dir.join(format!("{}.json", spec.plural));
        match tokio::fs::read(&path).await {
            Ok(body) => parse_list_bytes(kind, &body).map_err(|source| ListError::Decode {
                kind: kind.to_string(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No fixture for {} at {}", kind, path.display());
                Ok(Vec::new())
            }
            Err(source) => Err(ListError::Io {
                kind: kind.to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl ResourceLister for FixtureLister {
    async fn list(&self, kind: &str, spec: &KindSpec) -> Result<Vec<ResourceSnapshot>, ListError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let unavailable = self
            .unavailable
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(kind);
        if unavailable {
            return Err(ListError::Io {
                kind: kind.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "kind marked unavailable",
                ),
            });
        }

        let document = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned();

        match document {
            Some(document) => parse_list(kind, &document).map_err(|source| ListError::Decode {
                kind: kind.to_string(),
                source,
            }),
            None => self.read_dir_document(kind, spec).await,
        }
    }

    fn lister_type(&self) -> &str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod_spec() -> KindSpec {
        KindSpec::new("pods", "api/v1", Vec::<String>::new())
    }

    #[tokio::test]
    async fn test_in_memory_documents() {
        let lister = FixtureLister::new();
        lister.insert("Pod", json!({"items": [{"metadata": {"name": "p1"}}]}));

        let pods = lister.list("Pod", &pod_spec()).await.unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].name(), "p1");

        lister.remove("Pod");
        assert!(lister.list("Pod", &pod_spec()).await.unwrap().is_empty());
        assert_eq!(lister.calls(), 2);
        assert_eq!(lister.lister_type(), "fixture");
    }

    #[tokio::test]
    async fn test_unavailable_kind_fails_until_restored() {
        let lister = FixtureLister::new();
        lister.insert("Pod", json!({"items": []}));
        lister.mark_unavailable("Pod");
        assert!(matches!(
            lister.list("Pod", &pod_spec()).await,
            Err(ListError::Io { .. })
        ));

        lister.restore("Pod");
        assert!(lister.list("Pod", &pod_spec()).await.is_ok());
    }

    #[tokio::test]
    async fn test_directory_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pods.json"),
            r#"{"items": [{"metadata": {"name": "from-file"}, "status": {"phase": "Running"}}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("secrets.json"), "{broken").unwrap();

        let lister = FixtureLister::from_dir(dir.path());
        let pods = lister.list("Pod", &pod_spec()).await.unwrap();
        assert_eq!(pods[0].name(), "from-file");
        assert_eq!(pods[0].status, "Running");

        let missing = KindSpec::new("services", "api/v1", Vec::<String>::new());
        assert!(lister.list("Service", &missing).await.unwrap().is_empty());

        let broken = KindSpec::new("secrets", "api/v1", Vec::<String>::new());
        assert!(matches!(
            lister.list("Secret", &broken).await,
            Err(ListError::Decode { .. })
        ));
    }
}
