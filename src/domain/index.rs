//! Hierarchy index: id → node map, container → children map and the pure-leaf set.
//!
//! Every id lives in exactly one child set (a container's, or the synthetic `no-parent`
//! bucket). Only containers own a key in `container_children`.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, instrument, trace};

use crate::domain::node::{Node, NO_PARENT};

/// Decides whether a node is a container.
pub trait ContainerClassifier {
    fn is_container(&self, node: &Node) -> bool;
}

/// Classifies by the payload `isParent` marker only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayloadClassifier;

impl ContainerClassifier for PayloadClassifier {
    fn is_container(&self, node: &Node) -> bool {
        node.is_parent_marked()
    }
}

/// Derived indices over the node forest.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyIndex {
    pub(crate) node_map: BTreeMap<String, Node>,
    pub(crate) container_children: BTreeMap<String, BTreeSet<String>>,
    pub(crate) pure_leaf_ids: BTreeSet<String>,
}

impl Default for HierarchyIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyIndex {
    pub fn new() -> Self {
        let mut container_children = BTreeMap::new();
        container_children.insert(NO_PARENT.to_string(), BTreeSet::new());
        Self {
            node_map: BTreeMap::new(),
            container_children,
            pure_leaf_ids: BTreeSet::new(),
        }
    }

    /// Build all indices from a flat node list.
    ///
    /// Implemented as repeated [`HierarchyIndex::add_single_node`], so the result does not
    /// depend on whether parents come before their children.
    #[instrument(level = "debug", skip_all)]
    pub fn rebuild(
        nodes: impl IntoIterator<Item = Node>,
        classifier: &dyn ContainerClassifier,
    ) -> Self {
        let mut index = Self::new();
        for node in nodes {
            index.add_single_node(node, classifier);
        }
        debug!(
            "rebuild: {} nodes, {} containers, {} leaves",
            index.node_map.len(),
            index.container_count(),
            index.pure_leaf_ids.len()
        );
        index
    }

    /// Index one node against the existing indices.
    ///
    /// The node is routed into its parent's child set when the parent is an indexed
    /// container, otherwise into `no-parent`. A container adopts root-level nodes that
    /// already name it as parent.
    pub fn add_single_node(&mut self, node: Node, classifier: &dyn ContainerClassifier) {
        let id = node.id.clone();
        let is_container = classifier.is_container(&node);
        let bucket = self.resolve_bucket(node.parent_id.as_deref());
        trace!("add_single_node: {} -> {}", id, bucket);

        self.node_map.insert(id.clone(), node);
        self.container_children
            .entry(bucket)
            .or_default()
            .insert(id.clone());

        if is_container {
            self.container_children.entry(id.clone()).or_default();
            self.adopt_orphans(&id);
        } else {
            self.pure_leaf_ids.insert(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.node_map.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    pub fn node_map(&self) -> &BTreeMap<String, Node> {
        &self.node_map
    }

    pub fn container_children(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.container_children
    }

    pub fn pure_leaf_ids(&self) -> &BTreeSet<String> {
        &self.pure_leaf_ids
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_map.values()
    }

    /// Direct children of a container, `None` for non-containers.
    pub fn children_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.container_children.get(id)
    }

    /// Ids in the `no-parent` bucket.
    pub fn root_ids(&self) -> impl Iterator<Item = &String> {
        self.container_children
            .get(NO_PARENT)
            .into_iter()
            .flat_map(|roots| roots.iter())
    }

    /// Whether `id` is an indexed container.
    pub fn is_container(&self, id: &str) -> bool {
        id != NO_PARENT && self.container_children.contains_key(id)
    }

    pub fn container_count(&self) -> usize {
        self.container_children.len() - usize::from(self.container_children.contains_key(NO_PARENT))
    }

    /// The container whose child set holds `id`, `None` for root-level nodes.
    pub fn parent_in_index(&self, id: &str) -> Option<&str> {
        let parent = self.node_map.get(id)?.parent_id.as_deref()?;
        self.container_children
            .get(parent)
            .filter(|children| parent != NO_PARENT && children.contains(id))
            .map(|_| parent)
    }

    /// Whether `ancestor` contains `id`, directly or transitively.
    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = id;
        while visited.insert(current) {
            match self.parent_in_index(current) {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Every id counted exactly once across the child sets, every key a known container,
    /// leaves and containers disjoint and covering the node map.
    pub fn is_consistent(&self) -> bool {
        let mut seen = BTreeSet::new();
        for children in self.container_children.values() {
            for id in children {
                if !self.node_map.contains_key(id) || !seen.insert(id.as_str()) {
                    return false;
                }
            }
        }
        let keys_known = self
            .container_children
            .keys()
            .all(|key| key == NO_PARENT || self.node_map.contains_key(key));
        let disjoint = self
            .pure_leaf_ids
            .iter()
            .all(|id| !self.container_children.contains_key(id));
        seen.len() == self.node_map.len()
            && keys_known
            && disjoint
            && self.pure_leaf_ids.len() + self.container_count() == self.node_map.len()
    }

    pub(crate) fn resolve_bucket(&self, parent_id: Option<&str>) -> String {
        match parent_id {
            Some(parent) if self.is_container(parent) => parent.to_string(),
            _ => NO_PARENT.to_string(),
        }
    }

    /// Remove `id` from the child set that holds it.
    pub(crate) fn detach(&mut self, id: &str, parent_id: Option<&str>) {
        if let Some(children) = parent_id.and_then(|p| self.container_children.get_mut(p)) {
            if children.remove(id) {
                return;
            }
        }
        if let Some(roots) = self.container_children.get_mut(NO_PARENT) {
            roots.remove(id);
        }
    }

    /// Route an already stored node into the child set its `parent_id` resolves to.
    pub(crate) fn attach(&mut self, id: &str) {
        let parent_id = self.node_map.get(id).and_then(|n| n.parent_id.clone());
        let bucket = self.resolve_bucket(parent_id.as_deref());
        self.container_children
            .entry(bucket)
            .or_default()
            .insert(id.to_string());
    }

    /// Move root-level nodes naming `container_id` as parent into its child set.
    /// A node that already contains `container_id` stays where it is. Returns the adopted ids.
    pub(crate) fn adopt_orphans(&mut self, container_id: &str) -> Vec<String> {
        let orphans: Vec<String> = self
            .root_ids()
            .filter(|id| id.as_str() != container_id)
            .filter(|id| {
                self.node_map
                    .get(id.as_str())
                    .and_then(|n| n.parent_id.as_deref())
                    == Some(container_id)
            })
            .filter(|id| !self.is_ancestor(id, container_id))
            .cloned()
            .collect();

        for orphan in &orphans {
            trace!("adopt: {} -> {}", orphan, container_id);
            if let Some(roots) = self.container_children.get_mut(NO_PARENT) {
                roots.remove(orphan);
            }
            self.container_children
                .entry(container_id.to_string())
                .or_default()
                .insert(orphan.clone());
        }
        orphans
    }
}
