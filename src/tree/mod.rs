//! Composition tree building
//!
//! Walks the composition schema downward from one resource, matching live
//! child instances to their owners, and records the result as a flat
//! sequence of per-level slices.

mod builder;

pub use builder::TreeBuilder;

use serde::{Deserialize, Serialize};

use crate::lister::{ResourceIdentity, ResourceSnapshot};

/// One horizontal cut of a composition tree
///
/// All instances of `child_kind` found at `depth` that are owned by
/// `parent`. The root of a tree sits at depth 1, so slices start at 2.
///
/// `parent_slice` is the index, within the same flat tree, of the slice
/// whose member is `parent`; `None` when `parent` is the root. The same
/// identity can be expanded more than once in one tree (owners are matched
/// by name only), and this index tells those expansions apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSlice {
    pub depth: u32,
    pub child_kind: String,
    pub parent: ResourceIdentity,
    #[serde(default)]
    pub parent_slice: Option<usize>,
    pub members: Vec<ResourceSnapshot>,
}

impl LevelSlice {
    /// Whether this slice holds the direct children of the `kind`/`name`
    /// member of the slice at `parent_slice` (`None` for the root)
    pub fn is_child_of(&self, parent_slice: Option<usize>, kind: &str, name: &str) -> bool {
        self.parent_slice == parent_slice && self.parent.kind == kind && self.parent.name == name
    }
}

/// Deepest level present in a flat tree, 1 when the tree is empty
pub fn max_depth(tree: &[LevelSlice]) -> u32 {
    tree.iter()
        .filter(|slice| !slice.members.is_empty())
        .map(|slice| slice.depth)
        .max()
        .unwrap_or(1)
}
