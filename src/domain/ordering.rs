//! Depth computation and root-first ordering of containers.

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use tracing::instrument;

use crate::domain::index::HierarchyIndex;
use crate::domain::node::Node;

/// Number of `parent_id` hops from `id` up to its topmost ancestor.
///
/// A parent that is not in `node_map` ends the walk. On a containment cycle the walk stops
/// when it re-enters a node it already visited, so cyclic members read a shallow depth
/// instead of looping.
pub fn depth_of(node_map: &BTreeMap<String, Node>, id: &str) -> usize {
    let mut visited = HashSet::new();
    let mut hops = 0;
    let mut current = id;

    while visited.insert(current) {
        match node_map.get(current).and_then(|n| n.parent_id.as_deref()) {
            Some(parent) if node_map.contains_key(parent) => {
                hops += 1;
                current = parent;
            }
            _ => break,
        }
    }
    hops
}

/// Visible containers, shallowest first.
///
/// Order among containers of equal depth is unspecified.
#[instrument(level = "trace", skip_all)]
pub fn organize_containers(index: &HierarchyIndex) -> Vec<Node> {
    index
        .container_children()
        .keys()
        .filter_map(|id| index.get(id))
        .filter(|node| !node.hidden)
        .map(|node| (depth_of(index.node_map(), &node.id), node))
        .sorted_by_key(|(depth, _)| *depth)
        .map(|(_, node)| node.clone())
        .collect()
}

/// Sequence handed to the rendering and layout collaborators: visible containers
/// root-first, then visible pure leaves.
pub fn render_order(index: &HierarchyIndex) -> Vec<Node> {
    let mut ordered = organize_containers(index);
    ordered.extend(
        index
            .pure_leaf_ids()
            .iter()
            .filter_map(|id| index.get(id))
            .filter(|node| !node.hidden)
            .cloned(),
    );
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(nodes: Vec<Node>) -> BTreeMap<String, Node> {
        nodes.into_iter().map(|n| (n.id.clone(), n)).collect()
    }

    #[test]
    fn given_missing_parent_when_computing_depth_then_node_is_root() {
        let nodes = map(vec![Node::new("a", "note").with_parent("ghost")]);
        assert_eq!(depth_of(&nodes, "a"), 0);
    }

    #[test]
    fn given_self_parent_when_computing_depth_then_terminates() {
        let nodes = map(vec![Node::new("a", "group").with_parent("a")]);
        assert_eq!(depth_of(&nodes, "a"), 1);
    }

    #[test]
    fn given_unknown_id_when_computing_depth_then_zero() {
        assert_eq!(depth_of(&BTreeMap::new(), "nope"), 0);
    }
}
