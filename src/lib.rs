//! kubeprov library
//!
//! Discovers the ownership structure of resources running in a Kubernetes
//! cluster and keeps an in-memory provenance graph that can be queried by
//! kind and name. The binary and the integration tests both build on this.

pub mod cli;
pub mod config;
pub mod kube;
pub mod lister;
pub mod query;
pub mod refresh;
pub mod registry;
pub mod schema;
pub mod services;
pub mod store;
pub mod tree;

// Re-export commonly used types for convenience
pub use lister::{FixtureLister, OwnerReference, ResourceIdentity, ResourceLister, ResourceSnapshot};
pub use query::{CompositionNode, QueryEngine, Reconstruction};
pub use refresh::{CycleReport, RefreshLoop};
pub use schema::{CompositionSchema, KindSpec, SchemaRegistry};
pub use services::ProvenanceSession;
pub use store::{ProvenanceRecord, ProvenanceStore, PurgeMatch};
pub use tree::{LevelSlice, TreeBuilder};
