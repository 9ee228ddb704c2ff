//! Query engine
//!
//! Resolves a `(kind, name)` request against the provenance store and
//! returns the matching records as nested composition trees.

mod reconstruct;

pub use reconstruct::{reconstruct_by_level, reconstruct_linked};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::schema::SchemaRegistry;
use crate::store::{ProvenanceRecord, ProvenanceStore};

/// Name that matches every record of the requested kind
pub const WILDCARD: &str = "*";

/// Errors surfaced to query callers
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("failed to serialize query result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One node of a reconstructed composition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompositionNode {
    pub level: u32,
    pub kind: String,
    pub name: String,
    pub status: String,
    pub children: Vec<CompositionNode>,
}

impl CompositionNode {
    pub fn new(
        level: u32,
        kind: impl Into<String>,
        name: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            level,
            kind: kind.into(),
            name: name.into(),
            status: status.into(),
            children: Vec::new(),
        }
    }
}

/// How flat level slices are turned back into a nested tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reconstruction {
    /// Follow the parent link carried by every slice
    #[default]
    Linked,
    /// Match slices by depth and kind only, consuming each once
    LevelHeuristic,
}

impl Reconstruction {
    pub fn reconstruct(self, record: &ProvenanceRecord) -> CompositionNode {
        match self {
            Self::Linked => reconstruct_linked(record),
            Self::LevelHeuristic => reconstruct_by_level(record),
        }
    }
}

/// Answers composition queries against a store
#[derive(Clone)]
pub struct QueryEngine {
    store: ProvenanceStore,
    registry: Arc<SchemaRegistry>,
    mode: Reconstruction,
}

impl QueryEngine {
    pub fn new(store: ProvenanceStore, registry: Arc<SchemaRegistry>, mode: Reconstruction) -> Self {
        Self {
            store,
            registry,
            mode,
        }
    }

    /// Trees of every record matching `kind` and `name`
    ///
    /// `kind` may be the singular kind or its plural, in any case. `name` is
    /// matched case-insensitively, or [`WILDCARD`] for every instance. No
    /// match yields an empty list.
    pub fn compositions(&self, kind: &str, name: &str) -> Vec<CompositionNode> {
        let kind = self
            .registry
            .resolve_kind(kind)
            .unwrap_or_else(|| kind.to_string());
        let wildcard = name == WILDCARD;

        // Copy out under the lock, rebuild after releasing it
        let matching: Vec<ProvenanceRecord> = self.store.with_records(|records| {
            records
                .iter()
                .filter(|r| r.kind.eq_ignore_ascii_case(&kind))
                .filter(|r| wildcard || r.name.eq_ignore_ascii_case(name))
                .cloned()
                .collect()
        });

        tracing::debug!(
            "Query {}/{} matched {} record(s)",
            kind,
            name,
            matching.len()
        );

        matching
            .iter()
            .map(|record| self.mode.reconstruct(record))
            .collect()
    }

    /// Query serialized as a JSON array
    pub fn query(&self, kind: &str, name: &str) -> Result<String, QueryError> {
        let nodes = self.compositions(kind, name);
        Ok(serde_json::to_string(&nodes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lister::{ResourceIdentity, ResourceSnapshot};
    use crate::schema::{CompositionSchema, KindSpec};
    use crate::tree::LevelSlice;

    fn engine_with(records: &[(&str, &str, Vec<LevelSlice>)]) -> QueryEngine {
        let store = ProvenanceStore::new();
        for (kind, name, tree) in records {
            store.upsert(&ResourceSnapshot::new(*kind, *name), kind, name, tree.clone());
        }
        let registry = Arc::new(SchemaRegistry::fixed(CompositionSchema::builtin()));
        QueryEngine::new(store, registry, Reconstruction::Linked)
    }

    #[test]
    fn test_query_shape() {
        let mut schema = CompositionSchema::new();
        schema.insert("A", KindSpec::new("as", "api/v1", ["B"]));
        schema.insert("B", KindSpec::new("bs", "api/v1", Vec::<String>::new()));
        let store = ProvenanceStore::new();
        store.upsert(
            &ResourceSnapshot::new("A", "a1"),
            "A",
            "a1",
            vec![LevelSlice {
                depth: 2,
                child_kind: "B".to_string(),
                parent: ResourceIdentity::new("A", "a1"),
                parent_slice: None,
                members: vec![ResourceSnapshot::new("B", "b1").owned_by("A", "a1")],
            }],
        );
        let engine = QueryEngine::new(
            store,
            Arc::new(SchemaRegistry::fixed(schema)),
            Reconstruction::LevelHeuristic,
        );

        insta::assert_snapshot!(
            engine.query("A", "a1").unwrap(),
            @r#"[{"Level":1,"Kind":"A","Name":"a1","Status":"","Children":[{"Level":2,"Kind":"B","Name":"b1","Status":"","Children":[]}]}]"#
        );
    }

    #[test]
    fn test_case_insensitive_kind_and_name() {
        let engine = engine_with(&[("Deployment", "myapp", vec![])]);
        let nodes = engine.compositions("deployment", "MyApp");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, "Deployment");
        assert_eq!(nodes[0].name, "myapp");

        assert_eq!(engine.compositions("DEPLOYMENTS", "myapp").len(), 1);
    }

    #[test]
    fn test_wildcard_returns_every_instance_of_kind() {
        let engine = engine_with(&[
            ("Deployment", "a", vec![]),
            ("Service", "s", vec![]),
            ("Deployment", "b", vec![]),
        ]);
        let names: Vec<String> = engine
            .compositions("Deployment", WILDCARD)
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_miss_is_empty_not_error() {
        let engine = engine_with(&[("Deployment", "a", vec![])]);
        assert!(engine.compositions("Deployment", "zzz").is_empty());
        assert!(engine.compositions("Gadget", WILDCARD).is_empty());
        assert_eq!(engine.query("Gadget", "x").unwrap(), "[]");
    }

    #[test]
    fn test_reconstruction_mode_serde_names() {
        let mode: Reconstruction = serde_yaml::from_str("levelHeuristic").unwrap();
        assert_eq!(mode, Reconstruction::LevelHeuristic);
        assert_eq!(Reconstruction::default(), Reconstruction::Linked);
    }
}
