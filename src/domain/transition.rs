//! State transition function: the single place where the indices change.
//!
//! `transition` consumes the current state and a mutation request and returns the next
//! state. Rejected requests return the input state unchanged together with the reason.

use std::collections::HashSet;

use tracing::{debug, instrument, trace};

use crate::domain::cascade::{inherit_visibility, remove_subtrees};
use crate::domain::error::DomainError;
use crate::domain::index::{ContainerClassifier, HierarchyIndex};
use crate::domain::node::{Node, NO_PARENT};
use crate::domain::ordering::{depth_of, render_order};
use crate::domain::snapshot::Snapshot;

/// Mutation requests accepted by [`transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Replace the whole forest.
    ReplaceAll(Vec<Node>),
    Insert(Node),
    /// Cascade-delete the given ids.
    Remove(Vec<String>),
    PatchOne(Node),
    /// Apply several patches as one transition; unknown ids are skipped.
    PatchMany(Vec<Node>),
    /// Load a persisted snapshot; behaves like `ReplaceAll`.
    Rehydrate(Snapshot),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::ReplaceAll(_) => "replace_all",
            Mutation::Insert(_) => "insert",
            Mutation::Remove(_) => "remove",
            Mutation::PatchOne(_) => "patch_one",
            Mutation::PatchMany(_) => "patch_many",
            Mutation::Rehydrate(_) => "rehydrate",
        }
    }
}

/// Indexed forest plus its render order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramState {
    index: HierarchyIndex,
    ordered: Vec<Node>,
}

impl DiagramState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: HierarchyIndex) -> Self {
        let ordered = render_order(&index);
        Self { index, ordered }
    }

    pub fn index(&self) -> &HierarchyIndex {
        &self.index
    }

    /// Visible nodes, containers root-first, then pure leaves.
    pub fn ordered(&self) -> &[Node] {
        &self.ordered
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id)
    }

    pub fn depth_of(&self, id: &str) -> usize {
        depth_of(self.index.node_map(), id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.index.nodes().cloned().collect())
    }
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: DiagramState,
    /// Rejections and corrections, in the order they occurred.
    pub issues: Vec<DomainError>,
    /// Whether the state differs from the input.
    pub changed: bool,
}

impl Transition {
    fn unchanged(state: DiagramState, issue: DomainError) -> Self {
        Self {
            state,
            issues: vec![issue],
            changed: false,
        }
    }

    fn applied(index: HierarchyIndex, issues: Vec<DomainError>) -> Self {
        Self {
            state: DiagramState::from_index(index),
            issues,
            changed: true,
        }
    }
}

/// Map (state, request) to the next state.
#[instrument(level = "debug", skip_all, fields(mutation = mutation.name()))]
pub fn transition(
    state: DiagramState,
    mutation: Mutation,
    classifier: &dyn ContainerClassifier,
) -> Transition {
    match mutation {
        Mutation::ReplaceAll(nodes) => replace_all(state, nodes, classifier),
        Mutation::Rehydrate(snapshot) => replace_all(state, snapshot.nodes, classifier),
        Mutation::Insert(node) => insert(state, node, classifier),
        Mutation::Remove(ids) => remove(state, &ids),
        Mutation::PatchOne(node) => {
            let mut state = state;
            match apply_patch(&mut state.index, node, classifier) {
                Ok(correction) => {
                    Transition::applied(state.index, correction.into_iter().collect())
                }
                Err(e) => Transition::unchanged(state, e),
            }
        }
        Mutation::PatchMany(nodes) => patch_many(state, nodes, classifier),
    }
}

fn replace_all(
    state: DiagramState,
    nodes: Vec<Node>,
    classifier: &dyn ContainerClassifier,
) -> Transition {
    if let Err(e) = validate_bulk(&nodes) {
        return Transition::unchanged(state, e);
    }
    let index = HierarchyIndex::rebuild(nodes.into_iter().map(Node::normalized), classifier);
    Transition::applied(index, Vec::new())
}

fn validate_bulk(nodes: &[Node]) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for node in nodes {
        if node.has_reserved_id() {
            return Err(DomainError::MalformedInput(format!(
                "reserved node id {:?}",
                node.id
            )));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(DomainError::MalformedInput(format!(
                "node id {} listed twice",
                node.id
            )));
        }
    }
    Ok(())
}

fn insert(state: DiagramState, node: Node, classifier: &dyn ContainerClassifier) -> Transition {
    if node.has_reserved_id() {
        return Transition::unchanged(state, DomainError::ReservedId(node.id));
    }
    if state.index.contains(&node.id) {
        return Transition::unchanged(state, DomainError::DuplicateId(node.id));
    }
    let mut index = state.index;
    index.add_single_node(node.normalized(), classifier);
    Transition::applied(index, Vec::new())
}

fn remove(state: DiagramState, ids: &[String]) -> Transition {
    if !ids.iter().any(|id| state.index.contains(id)) {
        trace!("remove: nothing to do");
        return Transition {
            state,
            issues: Vec::new(),
            changed: false,
        };
    }
    let mut index = state.index;
    remove_subtrees(&mut index, ids);
    Transition::applied(index, Vec::new())
}

fn patch_many(
    state: DiagramState,
    nodes: Vec<Node>,
    classifier: &dyn ContainerClassifier,
) -> Transition {
    let mut state = state;
    let mut issues = Vec::new();
    let mut applied = 0;

    for node in nodes {
        match apply_patch(&mut state.index, node, classifier) {
            Ok(correction) => {
                applied += 1;
                issues.extend(correction);
            }
            Err(e) => issues.push(e),
        }
    }

    if applied == 0 {
        return Transition {
            state,
            issues,
            changed: false,
        };
    }
    Transition::applied(state.index, issues)
}

/// Replace a stored node, keeping every index consistent.
///
/// `Ok(Some(_))` carries a correction that was applied (dangling parent demoted to root).
/// On `Err` the index is left untouched.
fn apply_patch(
    index: &mut HierarchyIndex,
    patch: Node,
    classifier: &dyn ContainerClassifier,
) -> Result<Option<DomainError>, DomainError> {
    let Some(existing) = index.get(&patch.id) else {
        return Err(DomainError::NotFound(patch.id));
    };
    let old_parent = existing.parent_id.clone();
    let mut patch = patch.normalized();
    let mut correction = None;

    if let Some(parent_id) = patch.parent_id.clone() {
        if !index.contains(&parent_id) {
            correction = Some(DomainError::DanglingParent {
                id: patch.id.clone(),
                parent_id,
            });
            patch.parent_id = None;
        } else if old_parent.as_deref() != Some(parent_id.as_str())
            && parent_chain_reaches(index, &parent_id, &patch.id)
        {
            return Err(DomainError::CycleDetected {
                id: patch.id,
                parent_id,
            });
        }
    }

    let id = patch.id.clone();
    let was_container = index.is_container(&id);
    let will_be_container = classifier.is_container(&patch);
    let parent_changed = old_parent != patch.parent_id;

    if parent_changed {
        debug!("patch: {} moves {:?} -> {:?}", id, old_parent, patch.parent_id);
        index.detach(&id, old_parent.as_deref());
    }
    index.node_map.insert(id.clone(), patch);
    if parent_changed {
        index.attach(&id);
    }

    let mut reattached = Vec::new();
    if parent_changed {
        reattached.push(id.clone());
    }

    match (was_container, will_be_container) {
        (false, true) => {
            debug!("patch: {} becomes a container", id);
            index.pure_leaf_ids.remove(&id);
            index.container_children.entry(id.clone()).or_default();
            reattached.extend(index.adopt_orphans(&id));
        }
        (true, false) => {
            debug!("patch: {} is no longer a container", id);
            reattached.extend(release_children(index, &id));
            index.pure_leaf_ids.insert(id);
        }
        _ => {}
    }

    for moved in &reattached {
        inherit_visibility(index, moved);
    }

    Ok(correction)
}

/// Whether following stored `parent_id` links upward from `start` reaches `target`.
///
/// Walks raw links, including links to leaves that no child set records.
fn parent_chain_reaches(index: &HierarchyIndex, start: &str, target: &str) -> bool {
    let mut visited = HashSet::new();
    let mut current = Some(start);
    while let Some(id) = current {
        if id == target {
            return true;
        }
        if !visited.insert(id) {
            return false;
        }
        current = index.get(id).and_then(|n| n.parent_id.as_deref());
    }
    false
}

/// Drop a container's child set, turning its former children into roots.
/// Returns the released ids.
fn release_children(index: &mut HierarchyIndex, container_id: &str) -> Vec<String> {
    let children = index
        .container_children
        .remove(container_id)
        .unwrap_or_default();

    for child in &children {
        if let Some(node) = index.node_map.get_mut(child) {
            node.parent_id = None;
        }
        index
            .container_children
            .entry(NO_PARENT.to_string())
            .or_default()
            .insert(child.clone());
    }
    children.into_iter().collect()
}
