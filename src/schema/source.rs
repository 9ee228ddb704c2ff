//! Schema sources
//!
//! A source produces the kinds it currently declares. Sources:
//! - declarative composition document (YAML or JSON file)
//! - operator registry discovery (`/operators` then `/<name>` per custom resource)
//! - a fixed in-memory schema

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use super::{CompositionSchema, KindSpec, SchemaError};
use crate::registry::KeyValueStore;

/// Registry key listing the installed operators
pub const OPERATORS_KEY: &str = "/operators";

/// Produces the composition schema currently declared by some source
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn load(&self) -> Result<CompositionSchema, SchemaError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Child kinds given either as a list or as a comma-separated string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CompositionField {
    List(Vec<String>),
    Csv(String),
}

impl Default for CompositionField {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl CompositionField {
    fn into_children(self) -> Vec<String> {
        match self {
            Self::List(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Self::Csv(s) => split_composition(&s),
        }
    }
}

/// One kind declaration from a composition document or registry record
#[derive(Debug, Clone, Deserialize)]
pub struct CompositionEntry {
    pub kind: String,
    pub endpoint: String,
    pub plural: String,
    #[serde(default)]
    composition: CompositionField,
}

impl CompositionEntry {
    pub fn into_spec(self) -> (String, KindSpec) {
        let children = self.composition.into_children();
        (
            self.kind,
            KindSpec {
                plural: self.plural,
                endpoint: self.endpoint,
                children,
            },
        )
    }
}

/// Split a comma-separated child list, trimming blanks
pub fn split_composition(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a composition document (a YAML/JSON list of kind declarations)
///
/// Entries that do not decode are skipped.
pub fn parse_composition_document(contents: &str) -> Result<CompositionSchema, SchemaError> {
    let entries: Vec<serde_yaml::Value> = serde_yaml::from_str(contents)?;

    let mut schema = CompositionSchema::new();
    for (idx, entry) in entries.into_iter().enumerate() {
        match serde_yaml::from_value::<CompositionEntry>(entry) {
            Ok(entry) if !entry.kind.is_empty() => {
                let (kind, spec) = entry.into_spec();
                schema.insert(kind, spec);
            }
            Ok(_) => tracing::warn!("Skipping composition entry {} with empty kind", idx),
            Err(e) => tracing::warn!("Skipping malformed composition entry {}: {}", idx, e),
        }
    }
    Ok(schema)
}

#[derive(Debug, Deserialize)]
struct OperatorEntry {
    #[serde(rename = "Operator")]
    operator: OperatorData,
}

#[derive(Debug, Deserialize)]
struct OperatorData {
    #[serde(rename = "CustomResources", default)]
    custom_resources: Vec<String>,
}

/// Extract custom resource names from the `/operators` document
pub fn parse_operator_names(document: &str) -> Result<Vec<String>, SchemaError> {
    let entries: Vec<Value> =
        serde_json::from_str(document).map_err(|e| SchemaError::Malformed {
            key: OPERATORS_KEY.to_string(),
            reason: e.to_string(),
        })?;

    let mut names = Vec::new();
    for entry in entries {
        match serde_json::from_value::<OperatorEntry>(entry) {
            Ok(entry) => names.extend(entry.operator.custom_resources),
            Err(e) => tracing::warn!("Skipping malformed operator entry: {}", e),
        }
    }
    Ok(names)
}

/// Parse a `/<name>` record into a kind declaration
pub fn parse_kind_details(key: &str, document: &str) -> Result<(String, KindSpec), SchemaError> {
    let entry: CompositionEntry =
        serde_json::from_str(document).map_err(|e| SchemaError::Malformed {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
    Ok(entry.into_spec())
}

/// Reads the schema from a declarative composition document
pub struct FileSchemaSource {
    path: PathBuf,
}

impl FileSchemaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SchemaSource for FileSchemaSource {
    async fn load(&self) -> Result<CompositionSchema, SchemaError> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| SchemaError::Io {
                    path: self.path.display().to_string(),
                    source,
                })?;
        parse_composition_document(&contents)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Discovers custom kinds registered by operators in the registry service
pub struct OperatorRegistrySource {
    store: Arc<dyn KeyValueStore>,
}

impl OperatorRegistrySource {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SchemaSource for OperatorRegistrySource {
    async fn load(&self) -> Result<CompositionSchema, SchemaError> {
        let listing = self.store.get(OPERATORS_KEY).await?;
        let names = parse_operator_names(&listing)?;

        let mut schema = CompositionSchema::new();
        for name in names {
            let key = format!("/{}", name);
            let details = match self.store.get(&key).await {
                Ok(details) => details,
                Err(e) => {
                    tracing::warn!("Failed to fetch registry record {}: {}", key, e);
                    continue;
                }
            };
            match parse_kind_details(&key, &details) {
                Ok((kind, spec)) => {
                    tracing::debug!("Discovered kind {} ({}) from {}", kind, spec.plural, key);
                    schema.insert(kind, spec);
                }
                Err(e) => tracing::warn!("Skipping registry record {}: {}", key, e),
            }
        }
        Ok(schema)
    }

    fn describe(&self) -> String {
        "operator registry".to_string()
    }
}

/// A fixed schema, returned unchanged on every load
pub struct StaticSchemaSource {
    schema: CompositionSchema,
}

impl StaticSchemaSource {
    pub fn new(schema: CompositionSchema) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    async fn load(&self) -> Result<CompositionSchema, SchemaError> {
        Ok(self.schema.clone())
    }

    fn describe(&self) -> String {
        format!("static schema ({} kinds)", self.schema.len())
    }
}
