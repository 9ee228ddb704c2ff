//! Schema loading tests
//!
//! Composition files on disk and operator registry discovery, both feeding a
//! `SchemaRegistry` that overlays what they declare on the current schema.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kubeprov::registry::{KeyValueStore, RegistryError};
use kubeprov::schema::{FileSchemaSource, OperatorRegistrySource, SchemaError, SchemaSource};
use kubeprov::{CompositionSchema, KindSpec, SchemaRegistry};

/// In-memory registry keyed like the operator registry service
#[derive(Default)]
struct MapStore {
    values: Mutex<HashMap<String, String>>,
}

impl MapStore {
    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MapStore {
    async fn get(&self, key: &str) -> Result<String, RegistryError> {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }
}

#[tokio::test]
async fn test_file_source_reads_yaml_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("composition.yaml");
    std::fs::write(
        &yaml,
        "- kind: Moodle\n  endpoint: apis/moodlecontroller.kubeplus/v1\n  plural: moodles\n  composition:\n    - Deployment\n    - Service\n",
    )
    .unwrap();
    let json = dir.path().join("composition.json");
    std::fs::write(
        &json,
        r#"[{"kind": "Postgres", "endpoint": "apis/postgrescontroller.kubeplus/v1", "plural": "postgreses", "composition": "Deployment, Service, Secret"}]"#,
    )
    .unwrap();

    let moodle = FileSchemaSource::new(&yaml).load().await.unwrap();
    assert_eq!(moodle.children("Moodle"), ["Deployment", "Service"]);
    assert_eq!(moodle.get("Moodle").unwrap().plural, "moodles");

    let postgres = FileSchemaSource::new(&json).load().await.unwrap();
    assert_eq!(postgres.children("Postgres"), ["Deployment", "Service", "Secret"]);
    assert_eq!(
        postgres.get("Postgres").unwrap().endpoint,
        "apis/postgrescontroller.kubeplus/v1"
    );
}

#[tokio::test]
async fn test_file_source_rejects_non_list_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("composition.yaml");
    std::fs::write(&path, "kind: Postgres\n").unwrap();

    let result = FileSchemaSource::new(&path).load().await;
    assert!(matches!(result, Err(SchemaError::Parse(_))));
}

#[tokio::test]
async fn test_registry_reload_picks_up_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("composition.yaml");
    std::fs::write(&path, "- kind: Gadget\n  endpoint: api/v1\n  plural: gadgets\n").unwrap();

    let registry = SchemaRegistry::new(CompositionSchema::new(), Box::new(FileSchemaSource::new(&path)));
    registry.load().await.unwrap();
    assert!(registry.get("Gadget").unwrap().children.is_empty());

    std::fs::write(
        &path,
        "- kind: Gadget\n  endpoint: api/v1\n  plural: gadgets\n  composition: Widget\n- kind: Widget\n  endpoint: api/v1\n  plural: widgets\n",
    )
    .unwrap();
    assert_eq!(registry.load().await.unwrap(), 2);
    assert_eq!(registry.get("Gadget").unwrap().children, ["Widget"]);
    assert_eq!(registry.resolve_kind("WIDGETS").as_deref(), Some("Widget"));
}

#[tokio::test]
async fn test_operator_registry_discovery() {
    let store = Arc::new(MapStore::default());
    store.set(
        "/operators",
        r#"[{"Operator": {"Name": "postgres-crd-v2", "CustomResources": ["Postgres"]}},
            {"Operator": {"Name": "moodle-operator", "CustomResources": ["Moodle", "Missing"]}}]"#,
    );
    store.set(
        "/Postgres",
        r#"{"kind": "Postgres", "endpoint": "apis/postgrescontroller.kubeplus/v1", "plural": "postgreses", "composition": "Deployment, Service"}"#,
    );
    store.set(
        "/Moodle",
        r#"{"kind": "Moodle", "endpoint": "apis/moodlecontroller.kubeplus/v1", "plural": "moodles", "composition": ["Deployment"]}"#,
    );

    let key_value: Arc<dyn KeyValueStore> = store.clone();
    let registry = SchemaRegistry::new(
        CompositionSchema::builtin(),
        Box::new(OperatorRegistrySource::new(key_value)),
    );

    assert_eq!(registry.load().await.unwrap(), 2);
    assert_eq!(registry.kinds().len(), 9);
    assert_eq!(registry.get("Postgres").unwrap().children, ["Deployment", "Service"]);
    assert_eq!(registry.resolve_kind("moodles").as_deref(), Some("Moodle"));
    // Built-in kinds stay declared alongside the discovered ones
    assert_eq!(registry.get("Deployment").unwrap().children, ["ReplicaSet"]);
}

#[tokio::test]
async fn test_unreachable_registry_keeps_discovered_kinds() {
    let store = Arc::new(MapStore::default());
    store.set(
        "/operators",
        r#"[{"Operator": {"CustomResources": ["Postgres"]}}]"#,
    );
    store.set(
        "/Postgres",
        r#"{"kind": "Postgres", "endpoint": "apis/postgrescontroller.kubeplus/v1", "plural": "postgreses"}"#,
    );

    let key_value: Arc<dyn KeyValueStore> = store.clone();
    let registry = SchemaRegistry::new(
        CompositionSchema::new(),
        Box::new(OperatorRegistrySource::new(key_value)),
    );
    registry.load().await.unwrap();

    store.values.lock().unwrap().clear();
    assert!(matches!(
        registry.load().await,
        Err(SchemaError::Registry(RegistryError::NotFound(_)))
    ));
    assert_eq!(
        registry.get("Postgres"),
        Some(KindSpec::new(
            "postgreses",
            "apis/postgrescontroller.kubeplus/v1",
            Vec::<String>::new()
        ))
    );
}
