//! Composition schema
//!
//! Declares, per resource kind, where its instances are listed from and
//! which child kinds it can own. A kind absent from the schema, or declared
//! with no children, is a leaf.

mod registry;
mod source;

pub use registry::SchemaRegistry;
pub use source::{
    CompositionEntry, FileSchemaSource, OperatorRegistrySource, SchemaSource, StaticSchemaSource,
    parse_composition_document, parse_kind_details, parse_operator_names, split_composition,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::registry::RegistryError;

/// Errors produced while loading a schema
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read composition file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse composition document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("malformed registry document for {key}: {reason}")]
    Malformed { key: String, reason: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Listing details and children of one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSpec {
    pub plural: String,
    pub endpoint: String,
    #[serde(default)]
    pub children: Vec<String>,
}

impl KindSpec {
    pub fn new<I, S>(plural: impl Into<String>, endpoint: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            plural: plural.into(),
            endpoint: endpoint.into(),
            children: children.into_iter().map(Into::into).collect(),
        }
    }
}

/// Mapping from kind to its listing details and ordered child kinds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositionSchema {
    kinds: BTreeMap<String, KindSpec>,
}

impl CompositionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The core Kubernetes kinds known without any external source
    pub fn builtin() -> Self {
        let mut schema = Self::new();
        schema.insert(
            "Deployment",
            KindSpec::new("deployments", "apis/apps/v1", ["ReplicaSet"]),
        );
        schema.insert(
            "ReplicaSet",
            KindSpec::new("replicasets", "apis/apps/v1", ["Pod"]),
        );
        for (kind, plural) in [
            ("Pod", "pods"),
            ("Service", "services"),
            ("Secret", "secrets"),
            ("PersistentVolumeClaim", "persistentvolumeclaims"),
        ] {
            schema.insert(kind, KindSpec::new(plural, "api/v1", Vec::<String>::new()));
        }
        schema.insert(
            "PersistentVolume",
            KindSpec::new(
                "persistentvolumes",
                "api/v1/persistentvolumes",
                Vec::<String>::new(),
            ),
        );
        schema
    }

    /// Add or replace a kind
    pub fn insert(&mut self, kind: impl Into<String>, spec: KindSpec) {
        self.kinds.insert(kind.into(), spec);
    }

    /// Assign every kind of `other` onto this schema; kinds not mentioned
    /// in `other` are left untouched
    pub fn merge(&mut self, other: CompositionSchema) {
        self.kinds.extend(other.kinds);
    }

    pub fn get(&self, kind: &str) -> Option<&KindSpec> {
        self.kinds.get(kind)
    }

    /// Declared child kinds, empty for leaves and unknown kinds
    pub fn children(&self, kind: &str) -> &[String] {
        self.kinds
            .get(kind)
            .map(|spec| spec.children.as_slice())
            .unwrap_or_default()
    }

    pub fn kinds(&self) -> impl Iterator<Item = (&String, &KindSpec)> {
        self.kinds.iter()
    }

    pub fn kind_names(&self) -> Vec<String> {
        self.kinds.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Resolve a user-supplied kind to its canonical key
    ///
    /// Matches the singular key first, then the plural name, both
    /// case-insensitively.
    pub fn resolve_kind(&self, input: &str) -> Option<&str> {
        self.kinds
            .keys()
            .find(|kind| kind.eq_ignore_ascii_case(input))
            .or_else(|| {
                self.kinds
                    .iter()
                    .find(|(_, spec)| spec.plural.eq_ignore_ascii_case(input))
                    .map(|(kind, _)| kind)
            })
            .map(String::as_str)
    }

    /// Length of the longest child chain starting at `kind`, counting
    /// `kind` itself. Cycles are cut at the first repeated kind.
    pub fn chain_depth(&self, kind: &str) -> usize {
        fn walk(schema: &CompositionSchema, kind: &str, path: &mut Vec<String>) -> usize {
            if path.iter().any(|k| k == kind) {
                return 0;
            }
            path.push(kind.to_string());
            let deepest = schema
                .children(kind)
                .iter()
                .map(|child| walk(schema, child, path))
                .max()
                .unwrap_or(0);
            path.pop();
            deepest + 1
        }
        walk(self, kind, &mut Vec::new())
    }
}

impl FromIterator<(String, KindSpec)> for CompositionSchema {
    fn from_iter<T: IntoIterator<Item = (String, KindSpec)>>(iter: T) -> Self {
        Self {
            kinds: iter.into_iter().collect(),
        }
    }
}
