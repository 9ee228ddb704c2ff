//! Recursive tree builder

use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::LevelSlice;
use crate::lister::{ResourceIdentity, ResourceLister, ResourceSnapshot};
use crate::schema::CompositionSchema;

/// Builds flat composition trees for one refresh cycle
///
/// Listings are cached for the builder's lifetime, so every tree built in
/// the same cycle sees the same snapshot of a kind and each kind is listed
/// at most once. A failed listing yields no instances for the rest of the
/// cycle.
pub struct TreeBuilder<'a> {
    schema: &'a CompositionSchema,
    lister: &'a dyn ResourceLister,
    cache: HashMap<String, Arc<Vec<ResourceSnapshot>>>,
    failed: HashSet<String>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(schema: &'a CompositionSchema, lister: &'a dyn ResourceLister) -> Self {
        Self {
            schema,
            lister,
            cache: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    /// Current instances of `kind`, or `None` when listing failed this cycle
    pub async fn listing(&mut self, kind: &str) -> Option<Arc<Vec<ResourceSnapshot>>> {
        if let Some(cached) = self.cache.get(kind) {
            return Some(Arc::clone(cached));
        }
        if self.failed.contains(kind) {
            return None;
        }

        let Some(spec) = self.schema.get(kind) else {
            tracing::debug!("Kind {} is not declared in the schema, no instances", kind);
            let empty = Arc::new(Vec::new());
            self.cache.insert(kind.to_string(), Arc::clone(&empty));
            return Some(empty);
        };

        match self.lister.list(kind, spec).await {
            Ok(instances) => {
                let instances = Arc::new(instances);
                self.cache.insert(kind.to_string(), Arc::clone(&instances));
                Some(instances)
            }
            Err(e) => {
                tracing::warn!("Listing {} failed, treating as empty this cycle: {}", kind, e);
                self.failed.insert(kind.to_string());
                None
            }
        }
    }

    /// Kinds whose listing failed during this cycle
    pub fn failed_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.failed.iter().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Build the tree rooted at `kind`/`name` (the root sits at depth 1)
    pub async fn build(&mut self, kind: &str, name: &str) -> Vec<LevelSlice> {
        self.build_from(kind, name, 1).await
    }

    /// Build the tree below `kind`/`name` where the root sits at `depth`
    pub async fn build_from(&mut self, kind: &str, name: &str, depth: u32) -> Vec<LevelSlice> {
        let mut path = vec![ResourceIdentity::new(kind, name)];
        let mut tree = Vec::new();
        self.build_level(kind, name, depth, None, &mut path, &mut tree)
            .await;
        tree
    }

    /// Emit one slice per declared child kind, then descend into every
    /// kept child. `parent_slice` is the index of the slice `kind`/`name`
    /// was listed in. `path` holds the identities on the current recursion
    /// path; an instance already on it is listed but not expanded again.
    fn build_level<'s>(
        &'s mut self,
        kind: &'s str,
        name: &'s str,
        depth: u32,
        parent_slice: Option<usize>,
        path: &'s mut Vec<ResourceIdentity>,
        tree: &'s mut Vec<LevelSlice>,
    ) -> BoxFuture<'s, ()>
    where
        'a: 's,
    {
        async move {
            let child_kinds = self.schema.children(kind).to_vec();
            if child_kinds.is_empty() {
                return;
            }
            let depth = depth + 1;

            for child_kind in &child_kinds {
                let instances = self.listing(child_kind).await.unwrap_or_default();

                let mut members: Vec<ResourceSnapshot> = Vec::new();
                for instance in instances.iter().filter(|i| i.owner_name() == Some(name)) {
                    if members.iter().any(|m| m.name() == instance.name()) {
                        continue;
                    }
                    members.push(instance.clone());
                }

                let slot = tree.len();
                tree.push(LevelSlice {
                    depth,
                    child_kind: child_kind.clone(),
                    parent: ResourceIdentity::new(kind, name),
                    parent_slice,
                    members: members.clone(),
                });

                for member in &members {
                    if path.contains(&member.identity) {
                        tracing::warn!(
                            "Ownership cycle at {} below {}/{}, not expanding",
                            member.identity,
                            kind,
                            name
                        );
                        continue;
                    }
                    path.push(member.identity.clone());
                    self.build_level(child_kind, member.name(), depth, Some(slot), path, tree)
                        .await;
                    path.pop();
                }
            }
        }
        .boxed()
    }
}
