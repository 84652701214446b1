//! Cascading operations over containment: subtree removal and visibility propagation.

use std::collections::HashSet;

use tracing::{debug, instrument, trace};

use crate::domain::index::HierarchyIndex;
use crate::domain::node::Node;

/// Remove each target and everything it contains from all indices.
///
/// Ids that are not (or no longer) indexed are ignored, so overlapping targets and repeated
/// calls are harmless. Returns the removed nodes, children before their containers.
#[instrument(level = "debug", skip_all)]
pub fn remove_subtrees<I, S>(index: &mut HierarchyIndex, targets: I) -> Vec<Node>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut removed = Vec::new();
    for target in targets {
        remove_subtree(index, target.as_ref(), &mut removed);
    }
    debug!("remove_subtrees: removed {} nodes", removed.len());
    removed
}

fn remove_subtree(index: &mut HierarchyIndex, id: &str, removed: &mut Vec<Node>) {
    let Some(node) = index.node_map.remove(id) else {
        return;
    };
    index.detach(id, node.parent_id.as_deref());

    if let Some(children) = index.container_children.get(id).cloned() {
        for child in &children {
            remove_subtree(index, child, removed);
        }
    }

    index.container_children.remove(id);
    index.pure_leaf_ids.remove(id);
    removed.push(node);
}

/// Nodes whose `hidden` flag changes when `container_id` is shown or collapsed, with the
/// new flag already applied.
///
/// Direct children always flip. The cascade continues into a child container only while
/// that container is itself expanded; a collapsed container keeps its children's
/// visibility as it is. `expanded` is never touched.
#[instrument(level = "debug", skip(index))]
pub fn propagate_visibility(index: &HierarchyIndex, container_id: &str, show: bool) -> Vec<Node> {
    let mut flipped = Vec::new();
    let Some(children) = index.children_of(container_id) else {
        return flipped;
    };

    let mut visited: HashSet<&str> = HashSet::from([container_id]);
    let mut stack: Vec<&str> = children.iter().rev().map(String::as_str).collect();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = index.get(id) else {
            continue;
        };

        let mut updated = node.clone();
        updated.hidden = !show;
        flipped.push(updated);

        if node.is_expanded() {
            if let Some(grandchildren) = index.children_of(id) {
                stack.extend(grandchildren.iter().rev().map(String::as_str));
            }
        }
    }

    debug!("propagate_visibility: {} nodes flip", flipped.len());
    flipped
}

/// Re-derive `id`'s `hidden` flag from the container now holding it and carry a change
/// into its subtree.
///
/// A node is hidden exactly when its container is hidden or collapsed; root-level nodes are
/// visible. Used after a node changes child set.
pub(crate) fn inherit_visibility(index: &mut HierarchyIndex, id: &str) {
    let hidden = index
        .parent_in_index(id)
        .and_then(|parent| index.get(parent))
        .is_some_and(|parent| parent.hidden || !parent.is_expanded());

    let Some(node) = index.node_map.get_mut(id) else {
        return;
    };
    if node.hidden == hidden {
        return;
    }
    node.hidden = hidden;
    let show_children = !hidden && node.is_expanded();
    trace!("inherit_visibility: {} hidden={}", id, hidden);

    for updated in propagate_visibility(index, id, show_children) {
        index.node_map.insert(updated.id.clone(), updated);
    }
}
