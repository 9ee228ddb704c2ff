//! Provenance store
//!
//! Holds the latest composition tree of every top-level resource seen in
//! the cluster. All access goes through one exclusive lock, taken only for
//! the duration of a single operation and never across I/O, so a reader
//! always sees a record either before or after a whole replacement.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::lister::{ResourceIdentity, ResourceSnapshot};
use crate::tree::LevelSlice;

/// Separator written between records in the text dump
pub const DUMP_DIVIDER: &str = "============================================";

/// The flattened subtree rooted at one top-level resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub kind: String,
    pub name: String,
    pub status: String,
    pub tree: Vec<LevelSlice>,
}

impl ProvenanceRecord {
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(&self.kind, &self.name)
    }
}

/// How [`ProvenanceStore::purge`] decides a record is still present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PurgeMatch {
    /// Keep a record when any seen resource has its name, whatever the kind
    #[default]
    Name,
    /// Keep a record only when its exact kind and name were seen
    Identity,
}

/// Thread-safe provenance store
#[derive(Clone, Default)]
pub struct ProvenanceStore {
    records: Arc<Mutex<Vec<ProvenanceRecord>>>,
}

impl ProvenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ProvenanceRecord>> {
        // Records are replaced whole, so a poisoned lock still guards
        // consistent data
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the record for `kind`/`name`
    ///
    /// An existing record keeps its position and has its status and tree
    /// replaced; a new record is appended.
    pub fn upsert(
        &self,
        top_level: &ResourceSnapshot,
        kind: &str,
        name: &str,
        tree: Vec<LevelSlice>,
    ) {
        let mut records = self.lock();
        match records
            .iter_mut()
            .find(|r| r.kind == kind && r.name == name)
        {
            Some(existing) => {
                existing.status = top_level.status.clone();
                existing.tree = tree;
            }
            None => records.push(ProvenanceRecord {
                kind: kind.to_string(),
                name: name.to_string(),
                status: top_level.status.clone(),
                tree,
            }),
        }
    }

    /// Drop every record that does not match a seen identity
    ///
    /// Returns the number of records removed.
    pub fn purge(&self, seen: &[ResourceIdentity], matching: PurgeMatch) -> usize {
        let mut records = self.lock();
        let before = records.len();
        match matching {
            PurgeMatch::Name => {
                let names: HashSet<&str> = seen.iter().map(|id| id.name.as_str()).collect();
                records.retain(|r| names.contains(r.name.as_str()));
            }
            PurgeMatch::Identity => {
                let identities: HashSet<&ResourceIdentity> = seen.iter().collect();
                records.retain(|r| identities.contains(&r.identity()));
            }
        }
        before - records.len()
    }

    /// Run `f` against a consistent view of all records
    pub fn with_records<T>(&self, f: impl FnOnce(&[ProvenanceRecord]) -> T) -> T {
        let records = self.lock();
        f(&records)
    }

    /// Copy of every record
    pub fn snapshot(&self) -> Vec<ProvenanceRecord> {
        self.with_records(<[ProvenanceRecord]>::to_vec)
    }

    pub fn get(&self, kind: &str, name: &str) -> Option<ProvenanceRecord> {
        self.with_records(|records| {
            records
                .iter()
                .find(|r| r.kind == kind && r.name == name)
                .cloned()
        })
    }

    pub fn len(&self) -> usize {
        self.with_records(<[ProvenanceRecord]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every record as text, one block per top-level resource
    pub fn dump(&self) -> String {
        self.with_records(|records| {
            let mut out = String::from("Provenance of different Kinds in this Cluster\n");
            for record in records {
                let _ = writeln!(
                    out,
                    "Kind: {} Name: {} Composition:",
                    record.kind, record.name
                );
                for slice in &record.tree {
                    for member in &slice.members {
                        let _ = writeln!(
                            out,
                            "  {} {} {} {}",
                            slice.depth,
                            slice.child_kind,
                            member.name(),
                            member.status
                        );
                    }
                }
                out.push_str(DUMP_DIVIDER);
                out.push('\n');
            }
            out
        })
    }
}
