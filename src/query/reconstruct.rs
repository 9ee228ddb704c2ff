//! Rebuild nested composition trees from flat level slices

use std::collections::HashSet;

use super::CompositionNode;
use crate::store::ProvenanceRecord;
use crate::tree::LevelSlice;

/// Materialize a record by following each slice's parent link
///
/// Every slice is attached under exactly the expansion that produced it,
/// so siblings of the same kind at the same depth keep their own subtrees,
/// and an identity expanded twice carries each of its slices once.
pub fn reconstruct_linked(record: &ProvenanceRecord) -> CompositionNode {
    linked_node(
        &record.tree,
        None,
        1,
        &record.kind,
        &record.name,
        &record.status,
    )
}

fn linked_node(
    tree: &[LevelSlice],
    slot: Option<usize>,
    level: u32,
    kind: &str,
    name: &str,
    status: &str,
) -> CompositionNode {
    let mut node = CompositionNode::new(level, kind, name, status);
    for (index, slice) in tree.iter().enumerate() {
        if !slice.is_child_of(slot, kind, name) {
            continue;
        }
        for member in &slice.members {
            node.children.push(linked_node(
                tree,
                Some(index),
                slice.depth,
                &slice.child_kind,
                member.name(),
                &member.status,
            ));
        }
    }
    node
}

/// Rebuild a record using only each slice's depth and kind
///
/// A slice is expanded at most once per `(depth, kind)`; once it has been
/// attached under one node it is consumed for the rest of the record. When
/// two siblings of the same kind sit at the same depth, the grandchildren
/// below that depth are therefore attached to the first sibling only.
///
/// A slice with no members is consumed as well. If the first sibling owns
/// nothing, the second sibling's children are dropped rather than moved
/// onto the first one.
pub fn reconstruct_by_level(record: &ProvenanceRecord) -> CompositionNode {
    let view: Vec<&LevelSlice> = record.tree.iter().collect();
    let mut consumed = HashSet::new();
    level_node(
        &view,
        &mut consumed,
        1,
        &record.kind,
        &record.name,
        &record.status,
    )
}

fn level_node<'t>(
    view: &[&'t LevelSlice],
    consumed: &mut HashSet<(u32, &'t str)>,
    level: u32,
    kind: &str,
    name: &str,
    status: &str,
) -> CompositionNode {
    let mut node = CompositionNode::new(level, kind, name, status);

    for &slice in view {
        if slice.depth != level + 1 || consumed.contains(&(slice.depth, slice.child_kind.as_str())) {
            continue;
        }
        consumed.insert((slice.depth, slice.child_kind.as_str()));

        // Drop this slice's depth and kind from what the children may see
        let trimmed: Vec<&LevelSlice> = view
            .iter()
            .copied()
            .filter(|s| s.depth != slice.depth && s.child_kind != slice.child_kind)
            .collect();

        for member in &slice.members {
            node.children.push(level_node(
                &trimmed,
                consumed,
                slice.depth,
                &slice.child_kind,
                member.name(),
                &member.status,
            ));
        }
    }
    node
}
