//! Persisted shape of the node forest: only the flat node list.

use serde::{Deserialize, Serialize};

use crate::domain::node::Node;

/// Minimal persisted state. Derived indices are never stored; they are rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Snapshot {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Nodes with `expanded` normalized, as they are stored on insert.
    pub fn normalized(self) -> Self {
        Self {
            nodes: self.nodes.into_iter().map(Node::normalized).collect(),
        }
    }
}
