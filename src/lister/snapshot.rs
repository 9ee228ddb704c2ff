//! Typed decode of list documents into resource snapshots
//!
//! A list document is the JSON body returned by a Kubernetes list call:
//! an `items` array whose entries carry `metadata.name`, optional
//! `metadata.ownerReferences[]` and an optional `status` block. Decoding is
//! lenient per record: an item without a usable name is skipped, a malformed
//! owner reference or status block is dropped while the item itself is kept.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Status reported for workloads whose replica counts all agree
pub const READY_STATUS: &str = "Ready";

/// Unique key of a resource instance within the namespace scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub kind: String,
    pub name: String,
}

impl ResourceIdentity {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Declares which instance logically created a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub name: String,
    pub kind: String,
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
}

/// Point-in-time fact about one live instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub identity: ResourceIdentity,
    pub owner: Option<OwnerReference>,
    pub status: String,
}

impl ResourceSnapshot {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identity: ResourceIdentity::new(kind, name),
            owner: None,
            status: String::new(),
        }
    }

    pub fn owned_by(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.owner = Some(OwnerReference {
            name: name.into(),
            kind: kind.into(),
            api_version: String::new(),
        });
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn kind(&self) -> &str {
        &self.identity.kind
    }

    /// Name of the declared owner, if any
    pub fn owner_name(&self) -> Option<&str> {
        self.owner.as_ref().map(|o| o.name.as_str())
    }
}

/// Errors produced while decoding a list document
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("list document is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("list document has no items array")]
    MissingItems,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    metadata: RawMetadata,
    #[serde(default)]
    status: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    name: String,
    #[serde(rename = "ownerReferences", default)]
    owner_references: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    phase: Option<String>,
    replicas: Option<f64>,
    ready_replicas: Option<f64>,
    available_replicas: Option<f64>,
}

/// Derive the lifecycle status from a `status` block
///
/// The observed `phase` is used as-is; when `replicas` is positive and equal
/// to both `readyReplicas` and `availableReplicas` the status becomes
/// [`READY_STATUS`] regardless of phase.
pub fn derive_status(
    phase: Option<&str>,
    replicas: Option<f64>,
    ready_replicas: Option<f64>,
    available_replicas: Option<f64>,
) -> String {
    let replicas = replicas.unwrap_or(0.0);
    if replicas > 0.0
        && Some(replicas) == ready_replicas
        && Some(replicas) == available_replicas
    {
        return READY_STATUS.to_string();
    }
    phase.unwrap_or_default().to_string()
}

fn decode_status(value: &Value) -> Option<String> {
    match serde_json::from_value::<RawStatus>(value.clone()) {
        Ok(status) => Some(derive_status(
            status.phase.as_deref(),
            status.replicas,
            status.ready_replicas,
            status.available_replicas,
        )),
        Err(e) => {
            tracing::warn!("Skipping malformed status block: {}", e);
            None
        }
    }
}

fn decode_owner(value: &Value) -> Option<OwnerReference> {
    match serde_json::from_value::<Vec<OwnerReference>>(value.clone()) {
        // The last reference wins when several are declared
        Ok(refs) => refs.into_iter().last(),
        Err(e) => {
            tracing::warn!("Skipping malformed ownerReferences: {}", e);
            None
        }
    }
}

/// Decode one list item into a snapshot of the given kind
pub fn snapshot_from_item(kind: &str, item: &Value) -> Option<ResourceSnapshot> {
    let raw: RawItem = match serde_json::from_value(item.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Skipping malformed {} item: {}", kind, e);
            return None;
        }
    };

    if raw.metadata.name.is_empty() {
        tracing::warn!("Skipping {} item with empty name", kind);
        return None;
    }

    let owner = raw
        .metadata
        .owner_references
        .as_ref()
        .and_then(decode_owner);
    let status = raw
        .status
        .as_ref()
        .and_then(decode_status)
        .unwrap_or_default();

    Some(ResourceSnapshot {
        identity: ResourceIdentity::new(kind, raw.metadata.name),
        owner,
        status,
    })
}

/// Decode a parsed list document, skipping malformed items
pub fn parse_list(kind: &str, document: &Value) -> Result<Vec<ResourceSnapshot>, DecodeError> {
    let items = document
        .get("items")
        .and_then(|i| i.as_array())
        .ok_or(DecodeError::MissingItems)?;

    Ok(items
        .iter()
        .filter_map(|item| snapshot_from_item(kind, item))
        .collect())
}

/// Decode a raw list document body
pub fn parse_list_bytes(kind: &str, body: &[u8]) -> Result<Vec<ResourceSnapshot>, DecodeError> {
    let document: Value = serde_json::from_slice(body)?;
    parse_list(kind, &document)
}
