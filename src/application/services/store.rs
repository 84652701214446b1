//! Node store service
//!
//! Owns the current diagram state, funnels every mutation through the transition
//! function and keeps the persisted snapshot up to date.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::application::defaults::default_nodes;
use crate::application::snapshot::SnapshotRepository;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    propagate_visibility, transition, DiagramState, DomainError, Mutation, Node, Registry,
    Snapshot,
};

/// Service holding the authoritative node forest.
///
/// Collaborators never touch the indices directly: they submit mutations and read the
/// resulting state.
pub struct NodeStore {
    state: DiagramState,
    registry: Arc<Registry>,
    snapshots: Option<SnapshotRepository>,
}

impl NodeStore {
    /// In-memory store without persistence.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            state: DiagramState::new(),
            registry,
            snapshots: None,
        }
    }

    /// Store backed by a snapshot file.
    ///
    /// A missing or unreadable snapshot falls back to the built-in default nodes; the
    /// failure is logged, not returned.
    #[instrument(level = "debug", skip_all)]
    pub fn open(registry: Arc<Registry>, snapshots: SnapshotRepository) -> Self {
        let snapshot = match snapshots.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                info!("no snapshot at {}, using defaults", snapshots.path().display());
                Snapshot::new(default_nodes())
            }
            Err(e) => {
                warn!("cannot load snapshot, using defaults: {}", e);
                Snapshot::new(default_nodes())
            }
        };

        let mut store = Self {
            state: DiagramState::new(),
            registry,
            snapshots: None,
        };
        let issues = store.dispatch(Mutation::Rehydrate(snapshot));
        if !issues.is_empty() {
            warn!("snapshot rejected, using defaults");
            store.dispatch(Mutation::ReplaceAll(default_nodes()));
        }
        store.snapshots = Some(snapshots);
        store
    }

    pub fn state(&self) -> &DiagramState {
        &self.state
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run one mutation through the transition function.
    ///
    /// Returns the rejections and corrections of the transition; each one is also logged.
    /// A changed state is written to the snapshot; a failed write is logged and does not
    /// affect the mutation.
    #[instrument(level = "debug", skip_all, fields(mutation = mutation.name()))]
    pub fn dispatch(&mut self, mutation: Mutation) -> Vec<DomainError> {
        let state = std::mem::take(&mut self.state);
        let outcome = transition(state, mutation, self.registry.as_ref());
        self.state = outcome.state;

        for issue in &outcome.issues {
            warn!("{}", issue);
        }
        if outcome.changed {
            debug!(
                "dispatch: {} nodes, {} visible",
                self.state.index().len(),
                self.state.ordered().len()
            );
            self.persist();
        }
        outcome.issues
    }

    fn persist(&self) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        if let Err(e) = snapshots.save(&self.state.snapshot()) {
            warn!("snapshot not written: {}", e);
        }
    }

    // ============================================================
    // Mutation API
    // ============================================================

    /// Replace the whole forest.
    pub fn set_all(&mut self, nodes: Vec<Node>) -> ApplicationResult<()> {
        first_rejection(self.dispatch(Mutation::ReplaceAll(nodes)))
    }

    /// Replace the whole forest from untyped JSON; anything but an array of nodes is
    /// malformed input and leaves the state untouched.
    pub fn set_all_json(&mut self, value: Value) -> ApplicationResult<()> {
        if !value.is_array() {
            let e = DomainError::MalformedInput("expected a list of nodes".to_string());
            warn!("{}", e);
            return Err(e.into());
        }
        let nodes: Vec<Node> = serde_json::from_value(value).map_err(|e| {
            let e = DomainError::MalformedInput(e.to_string());
            warn!("{}", e);
            e
        })?;
        self.set_all(nodes)
    }

    pub fn insert(&mut self, node: Node) -> ApplicationResult<()> {
        first_rejection(self.dispatch(Mutation::Insert(node)))
    }

    /// Cascade-delete the given ids. Unknown ids are ignored. Returns how many nodes
    /// were removed in total.
    pub fn remove<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let before = self.state.index().len();
        let ids = ids.iter().map(|id| id.as_ref().to_string()).collect();
        self.dispatch(Mutation::Remove(ids));
        before - self.state.index().len()
    }

    /// Replace one node. A parent that does not exist is corrected (node becomes a
    /// root), an unknown id or a containment cycle is an error.
    pub fn patch_one(&mut self, node: Node) -> ApplicationResult<()> {
        first_rejection(self.dispatch(Mutation::PatchOne(node)))
    }

    /// Replace several nodes in one transition; failing entries are skipped and reported.
    pub fn patch_many(&mut self, nodes: Vec<Node>) -> Vec<DomainError> {
        self.dispatch(Mutation::PatchMany(nodes))
    }

    /// Expand or collapse a container: flips its own `expanded` flag and the `hidden`
    /// flag of everything the cascade reaches, as one transition.
    #[instrument(level = "debug", skip(self))]
    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> ApplicationResult<()> {
        let Some(container) = self.state.get(id) else {
            let e = DomainError::NotFound(id.to_string());
            warn!("{}", e);
            return Err(e.into());
        };
        let mut patches = vec![container.clone().expanded(expanded)];
        patches.extend(propagate_visibility(self.state.index(), id, expanded));
        first_rejection(self.dispatch(Mutation::PatchMany(patches)))
    }

    /// Restore the built-in default nodes.
    pub fn reset(&mut self) -> ApplicationResult<()> {
        self.set_all(default_nodes())
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.state.get(id)
    }

    /// Visible nodes in render order.
    pub fn ordered(&self) -> &[Node] {
        self.state.ordered()
    }

    /// All nodes, in snapshot order.
    pub fn nodes(&self) -> Vec<Node> {
        self.state.snapshot().nodes
    }

    pub fn children_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.state.index().children_of(id)
    }

    pub fn roots(&self) -> Vec<&Node> {
        let index = self.state.index();
        index.root_ids().filter_map(|id| index.get(id)).collect()
    }

    pub fn depth_of(&self, id: &str) -> usize {
        self.state.depth_of(id)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }
}

/// The first issue that left the state untouched, as an error.
fn first_rejection(issues: Vec<DomainError>) -> ApplicationResult<()> {
    match issues.into_iter().find(|issue| !issue.is_correction()) {
        Some(issue) => Err(ApplicationError::Domain(issue)),
        None => Ok(()),
    }
}
