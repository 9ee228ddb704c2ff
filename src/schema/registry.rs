//! Schema registry
//!
//! Holds the current composition schema and reloads it from its source on
//! demand. A failed load is logged and the previous schema stays in effect.

use std::sync::{PoisonError, RwLock};

use super::{CompositionSchema, KindSpec, SchemaError, SchemaSource};

/// Thread-safe holder of the composition schema
pub struct SchemaRegistry {
    schema: RwLock<CompositionSchema>,
    source: Option<Box<dyn SchemaSource>>,
}

impl SchemaRegistry {
    /// Create a registry reloading from `source`, starting from `initial`
    pub fn new(initial: CompositionSchema, source: Box<dyn SchemaSource>) -> Self {
        Self {
            schema: RwLock::new(initial),
            source: Some(source),
        }
    }

    /// Create a registry whose schema never changes
    pub fn fixed(schema: CompositionSchema) -> Self {
        Self {
            schema: RwLock::new(schema),
            source: None,
        }
    }

    /// Reload the schema from the source
    ///
    /// Every kind the source returns is assigned over the current schema;
    /// kinds the source does not mention keep their previous definition.
    /// Returns the number of kinds the source declared.
    pub async fn load(&self) -> Result<usize, SchemaError> {
        let Some(source) = &self.source else {
            return Ok(0);
        };

        // Fetch outside the lock; only the assignment is serialized
        match source.load().await {
            Ok(loaded) => {
                let count = loaded.len();
                self.schema
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .merge(loaded);
                tracing::debug!("Loaded {} kind(s) from {}", count, source.describe());
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load schema from {}, keeping previous schema: {}",
                    source.describe(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Copy of the current schema
    pub fn snapshot(&self) -> CompositionSchema {
        self.schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, kind: &str) -> Option<KindSpec> {
        self.schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned()
    }

    /// All declared kinds
    pub fn kinds(&self) -> Vec<String> {
        self.schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .kind_names()
    }

    /// Resolve a kind given in any case, singular or plural
    pub fn resolve_kind(&self, input: &str) -> Option<String> {
        self.schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve_kind(input)
            .map(str::to_string)
    }

    pub fn source_description(&self) -> String {
        self.source
            .as_ref()
            .map(|s| s.describe())
            .unwrap_or_else(|| "none".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FileSchemaSource, StaticSchemaSource};

    #[tokio::test]
    async fn test_load_overlays_source() {
        let mut declared = CompositionSchema::new();
        declared.insert(
            "Deployment",
            KindSpec::new("deployments", "apis/apps/v1", ["ReplicaSet", "Service"]),
        );
        let registry = SchemaRegistry::new(
            CompositionSchema::builtin(),
            Box::new(StaticSchemaSource::new(declared)),
        );

        assert_eq!(registry.load().await.unwrap(), 1);
        let schema = registry.snapshot();
        assert_eq!(schema.children("Deployment"), ["ReplicaSet", "Service"]);
        assert_eq!(schema.children("ReplicaSet"), ["Pod"]);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_schema() {
        let registry = SchemaRegistry::new(
            CompositionSchema::builtin(),
            Box::new(FileSchemaSource::new("/nonexistent/composition.yaml")),
        );

        assert!(registry.load().await.is_err());
        assert_eq!(registry.snapshot(), CompositionSchema::builtin());
    }

    #[tokio::test]
    async fn test_fixed_registry() {
        let registry = SchemaRegistry::fixed(CompositionSchema::builtin());
        assert_eq!(registry.load().await.unwrap(), 0);
        assert_eq!(registry.resolve_kind("pods").as_deref(), Some("Pod"));
        assert_eq!(registry.kinds().len(), 7);
        assert_eq!(registry.source_description(), "none");
    }
}
