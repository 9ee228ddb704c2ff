//! Resource listing
//!
//! The lister is the boundary to the cluster: given a kind's listing
//! endpoint and plural name it returns the current instances of that kind.
//! Two implementations are provided:
//! - [`KubeLister`] lists through the Kubernetes API using kube-rs
//! - [`FixtureLister`] serves list documents from memory or a directory
//!   (offline mode and tests)

mod cluster;
mod fixture;
mod snapshot;

pub use cluster::{KubeLister, ListTarget};
pub use fixture::FixtureLister;
pub use snapshot::{
    DecodeError, OwnerReference, READY_STATUS, ResourceIdentity, ResourceSnapshot, derive_status,
    parse_list, parse_list_bytes, snapshot_from_item,
};

use async_trait::async_trait;

use crate::schema::KindSpec;

/// Errors returned by a single listing call
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("invalid endpoint '{endpoint}' for {kind}: {reason}")]
    InvalidEndpoint {
        kind: String,
        endpoint: String,
        reason: String,
    },

    #[error("listing {kind} failed: {source}")]
    Api {
        kind: String,
        #[source]
        source: ::kube::Error,
    },

    #[error("reading list document for {kind} failed: {source}")]
    Io {
        kind: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding {kind} list failed: {source}")]
    Decode {
        kind: String,
        #[source]
        source: DecodeError,
    },
}

/// Lists the live instances of one resource kind
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceLister: Send + Sync {
    /// List every current instance of `kind` described by `spec`
    async fn list(&self, kind: &str, spec: &KindSpec) -> Result<Vec<ResourceSnapshot>, ListError>;

    /// Get lister type name
    fn lister_type(&self) -> &str;
}
