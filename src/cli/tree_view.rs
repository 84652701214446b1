//! Terminal rendering of the containment forest with termtree

use std::collections::BTreeSet;

use colored::Colorize;
use termtree::Tree;
use tracing::instrument;

use crate::domain::{HierarchyIndex, Node};

pub trait ForestConvert {
    fn to_tree_string(&self, include_hidden: bool) -> Tree<String>;
}

impl ForestConvert for HierarchyIndex {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, include_hidden: bool) -> Tree<String> {
        let mut visited = BTreeSet::new();
        let leaves: Vec<_> = self
            .root_ids()
            .filter_map(|id| build_tree(self, id, include_hidden, &mut visited))
            .collect();
        Tree::new(format!("{} nodes", self.len())).with_leaves(leaves)
    }
}

fn build_tree(
    index: &HierarchyIndex,
    id: &str,
    include_hidden: bool,
    visited: &mut BTreeSet<String>,
) -> Option<Tree<String>> {
    let node = index.get(id)?;
    if (node.hidden && !include_hidden) || !visited.insert(id.to_string()) {
        return None;
    }

    let mut tree = Tree::new(label(index, node));
    if let Some(children) = index.children_of(id) {
        for child in children {
            if let Some(subtree) = build_tree(index, child, include_hidden, visited) {
                tree.push(subtree);
            }
        }
    }
    Some(tree)
}

fn label(index: &HierarchyIndex, node: &Node) -> String {
    let marker = if !index.is_container(&node.id) {
        ""
    } else if node.is_expanded() {
        "[-] "
    } else {
        "[+] "
    };
    let text = format!("{}{} ({})", marker, node.id, node.node_type);
    if node.hidden {
        text.dimmed().to_string()
    } else {
        text
    }
}
