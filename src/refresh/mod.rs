//! Refresh loop
//!
//! One cycle reloads the schema, treats every declared kind as a potential
//! root, builds the tree of each of its instances, upserts the results and
//! purges records whose resource was not seen. Cycles repeat forever with a
//! fixed sleep in between; a slow cycle just delays the next one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::lister::{ResourceIdentity, ResourceLister};
use crate::schema::SchemaRegistry;
use crate::store::{ProvenanceStore, PurgeMatch};
use crate::tree::TreeBuilder;

/// Default pause between two cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Summary of one completed cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Kinds enumerated as roots
    pub kinds: usize,
    /// Records upserted
    pub records: usize,
    /// Records removed by the purge
    pub purged: usize,
    /// Kinds whose listing failed at any point of the cycle
    pub failed_kinds: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Drives schema reload, discovery and store reconciliation
pub struct RefreshLoop {
    registry: Arc<SchemaRegistry>,
    lister: Arc<dyn ResourceLister>,
    store: ProvenanceStore,
    interval: Duration,
    purge_match: PurgeMatch,
}

impl RefreshLoop {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        lister: Arc<dyn ResourceLister>,
        store: ProvenanceStore,
    ) -> Self {
        Self {
            registry,
            lister,
            store,
            interval: DEFAULT_INTERVAL,
            purge_match: PurgeMatch::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_purge_match(mut self, purge_match: PurgeMatch) -> Self {
        self.purge_match = purge_match;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn store(&self) -> &ProvenanceStore {
        &self.store
    }

    /// Run a single refresh cycle
    pub async fn run_cycle(&self) -> CycleReport {
        // A failed load is logged by the registry; the previous schema stays
        let _ = self.registry.load().await;
        let schema = self.registry.snapshot();

        let mut builder = TreeBuilder::new(&schema, self.lister.as_ref());
        let mut seen: Vec<ResourceIdentity> = Vec::new();
        let mut seen_set: HashSet<ResourceIdentity> = HashSet::new();
        let mut records = 0;

        for kind in schema.kind_names() {
            let Some(instances) = builder.listing(&kind).await else {
                // Keep what we had for this kind rather than purging it
                let stale: Vec<ResourceIdentity> = self.store.with_records(|records| {
                    records
                        .iter()
                        .filter(|r| r.kind == kind)
                        .map(|r| r.identity())
                        .collect()
                });
                tracing::debug!(
                    "Keeping {} stale record(s) of {} after a failed listing",
                    stale.len(),
                    kind
                );
                for identity in stale {
                    if seen_set.insert(identity.clone()) {
                        seen.push(identity);
                    }
                }
                continue;
            };

            for instance in instances.iter() {
                let tree = builder.build(&kind, instance.name()).await;
                self.store.upsert(instance, &kind, instance.name(), tree);
                records += 1;

                if seen_set.insert(instance.identity.clone()) {
                    seen.push(instance.identity.clone());
                }
            }
        }

        let purged = self.store.purge(&seen, self.purge_match);
        let report = CycleReport {
            kinds: schema.len(),
            records,
            purged,
            failed_kinds: builder.failed_kinds(),
            completed_at: Utc::now(),
        };

        tracing::info!(
            "Refresh cycle ({}): {} kind(s), {} record(s) upserted, {} purged, {} failed kind(s)",
            self.lister.lister_type(),
            report.kinds,
            report.records,
            report.purged,
            report.failed_kinds.len()
        );
        report
    }

    /// Run cycles until the task is dropped
    pub async fn run(&self) {
        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
