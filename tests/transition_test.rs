//! Tests for the state transition function
//!
//! Rejected requests return the input state unchanged and report why;
//! corrections are applied and reported.

use rstest::{fixture, rstest};

use mindgraph::domain::{
    transition, DiagramState, DomainError, HierarchyIndex, Mutation, Node, PayloadClassifier,
    Snapshot, NO_PARENT,
};

fn apply(state: DiagramState, mutation: Mutation) -> (DiagramState, Vec<DomainError>) {
    let outcome = transition(state, mutation, &PayloadClassifier);
    (outcome.state, outcome.issues)
}

fn group(id: &str) -> Node {
    Node::new(id, "group").as_container().expanded(true)
}

#[fixture]
fn state() -> DiagramState {
    let nodes = vec![
        group("root"),
        group("inner").with_parent("root"),
        Node::new("leaf", "note").with_parent("inner"),
        Node::new("side", "note").with_parent("root"),
    ];
    let (state, issues) = apply(DiagramState::new(), Mutation::ReplaceAll(nodes));
    assert!(issues.is_empty());
    state
}

fn in_root_bucket(state: &DiagramState, id: &str) -> bool {
    state
        .index()
        .children_of(NO_PARENT)
        .is_some_and(|roots| roots.contains(id))
}

// ============================================================
// ReplaceAll / Rehydrate
// ============================================================

#[rstest]
fn given_node_list_when_replace_all_then_indices_and_order_are_rebuilt(state: DiagramState) {
    assert_eq!(state.index().len(), 4);
    assert!(state.index().is_consistent());
    let ids: Vec<&str> = state.ordered().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids.first(), Some(&"root"));
    assert_eq!(ids.len(), 4);
}

#[test]
fn given_nodes_without_expanded_when_replace_all_then_expanded_is_normalized() {
    let (state, _) = apply(
        DiagramState::new(),
        Mutation::ReplaceAll(vec![Node::new("n", "note")]),
    );
    assert_eq!(state.get("n").and_then(|n| n.data.expanded), Some(false));
}

#[rstest]
#[case::duplicate_ids(vec![Node::new("a", "note"), Node::new("a", "note")])]
#[case::reserved_id(vec![Node::new(NO_PARENT, "note")])]
#[case::empty_id(vec![Node::new("", "note")])]
fn given_malformed_list_when_replace_all_then_state_is_unchanged(
    state: DiagramState,
    #[case] nodes: Vec<Node>,
) {
    // Arrange
    let before = state.clone();

    // Act
    let outcome = transition(state, Mutation::ReplaceAll(nodes), &PayloadClassifier);

    // Assert
    assert!(!outcome.changed);
    assert_eq!(outcome.state, before);
    assert!(matches!(outcome.issues.as_slice(), [DomainError::MalformedInput(_)]));
}

#[rstest]
fn given_snapshot_of_state_when_rehydrated_then_indices_are_equivalent(state: DiagramState) {
    // Arrange
    let json = serde_json::to_string(&state.snapshot()).unwrap();
    let snapshot: Snapshot = serde_json::from_str(&json).unwrap();

    // Act
    let (restored, issues) = apply(DiagramState::new(), Mutation::Rehydrate(snapshot));

    // Assert
    assert!(issues.is_empty());
    assert_eq!(
        restored.index().container_children(),
        state.index().container_children()
    );
    assert_eq!(restored.index().pure_leaf_ids(), state.index().pure_leaf_ids());
    assert_eq!(restored.index().node_map(), state.index().node_map());
}

// ============================================================
// Insert
// ============================================================

#[rstest]
fn given_new_node_when_insert_then_indexed_under_parent(state: DiagramState) {
    let (state, issues) = apply(
        state,
        Mutation::Insert(Node::new("extra", "note").with_parent("inner")),
    );

    assert!(issues.is_empty());
    assert!(state
        .index()
        .children_of("inner")
        .is_some_and(|c| c.contains("extra")));
    assert_eq!(state.get("extra").and_then(|n| n.data.expanded), Some(false));
    assert!(state.ordered().iter().any(|n| n.id == "extra"));
}

#[rstest]
fn given_existing_id_when_insert_then_rejected_and_existing_node_untouched(state: DiagramState) {
    // Arrange
    let before = state.clone();
    let impostor = Node::new("leaf", "datanode");

    // Act
    let outcome = transition(state, Mutation::Insert(impostor), &PayloadClassifier);

    // Assert
    assert!(!outcome.changed);
    assert_eq!(outcome.issues, vec![DomainError::DuplicateId("leaf".into())]);
    assert_eq!(outcome.state, before);
    assert_eq!(outcome.state.get("leaf").map(|n| n.node_type.as_str()), Some("note"));
}

#[rstest]
fn given_reserved_id_when_insert_then_rejected(state: DiagramState) {
    let outcome = transition(
        state,
        Mutation::Insert(Node::new(NO_PARENT, "note")),
        &PayloadClassifier,
    );
    assert_eq!(outcome.issues, vec![DomainError::ReservedId(NO_PARENT.into())]);
}

// ============================================================
// Remove
// ============================================================

#[rstest]
fn given_container_when_remove_then_subtree_is_gone(state: DiagramState) {
    let (state, issues) = apply(state, Mutation::Remove(vec!["inner".into()]));

    assert!(issues.is_empty());
    assert!(state.get("inner").is_none());
    assert!(state.get("leaf").is_none());
    assert!(state.ordered().iter().all(|n| n.id != "leaf"));
    assert!(state.index().is_consistent());
}

#[rstest]
fn given_removed_ids_when_remove_again_then_no_change_and_no_error(state: DiagramState) {
    // Arrange
    let (state, _) = apply(state, Mutation::Remove(vec!["inner".into()]));
    let before = state.clone();

    // Act
    let outcome = transition(
        state,
        Mutation::Remove(vec!["inner".into()]),
        &PayloadClassifier,
    );

    // Assert
    assert!(!outcome.changed);
    assert!(outcome.issues.is_empty());
    assert_eq!(outcome.state, before);
}

// ============================================================
// PatchOne / PatchMany
// ============================================================

#[rstest]
fn given_new_parent_when_patch_one_then_node_moves_between_child_sets(state: DiagramState) {
    // Arrange
    let moved = Node::new("side", "note").with_parent("inner");

    // Act
    let (state, issues) = apply(state, Mutation::PatchOne(moved));

    // Assert
    assert!(issues.is_empty());
    let index = state.index();
    assert!(index.children_of("inner").is_some_and(|c| c.contains("side")));
    assert!(!index.children_of("root").is_some_and(|c| c.contains("side")));
    assert_eq!(state.depth_of("side"), 2);
    assert!(index.is_consistent());
}

#[rstest]
fn given_missing_parent_when_patch_one_then_node_is_demoted_to_root(state: DiagramState) {
    // Act
    let (state, issues) = apply(
        state,
        Mutation::PatchOne(Node::new("leaf", "note").with_parent("ghost")),
    );

    // Assert
    assert_eq!(
        issues,
        vec![DomainError::DanglingParent {
            id: "leaf".into(),
            parent_id: "ghost".into()
        }]
    );
    assert_eq!(state.get("leaf").and_then(|n| n.parent_id.clone()), None);
    assert!(in_root_bucket(&state, "leaf"));
    assert!(!state
        .index()
        .children_of("inner")
        .is_some_and(|c| c.contains("leaf")));
}

#[rstest]
fn given_unknown_id_when_patch_one_then_rejected(state: DiagramState) {
    let before = state.clone();

    let outcome = transition(
        state,
        Mutation::PatchOne(Node::new("nobody", "note")),
        &PayloadClassifier,
    );

    assert!(!outcome.changed);
    assert_eq!(outcome.issues, vec![DomainError::NotFound("nobody".into())]);
    assert_eq!(outcome.state, before);
}

#[rstest]
#[case::self_parent("inner", "inner")]
#[case::descendant_parent("root", "inner")]
fn given_parent_inside_own_subtree_when_patch_one_then_cycle_rejected(
    state: DiagramState,
    #[case] id: &str,
    #[case] parent: &str,
) {
    // Arrange
    let before = state.clone();
    let patch = group(id).with_parent(parent);

    // Act
    let outcome = transition(state, Mutation::PatchOne(patch), &PayloadClassifier);

    // Assert
    assert!(!outcome.changed);
    assert_eq!(
        outcome.issues,
        vec![DomainError::CycleDetected {
            id: id.into(),
            parent_id: parent.into()
        }]
    );
    assert_eq!(outcome.state, before);
}

#[test]
fn given_container_linked_to_leaf_when_leaf_patched_under_it_then_cycle_rejected() {
    // Arrange: "box" names the leaf "anchor" as parent; no child set records that link
    let nodes = vec![Node::new("anchor", "note"), group("box").with_parent("anchor")];
    let (state, _) = apply(DiagramState::new(), Mutation::ReplaceAll(nodes));
    let before = state.clone();
    let patch = Node::new("anchor", "note").with_parent("box");

    // Act
    let outcome = transition(state, Mutation::PatchOne(patch), &PayloadClassifier);

    // Assert
    assert!(!outcome.changed);
    assert_eq!(
        outcome.issues,
        vec![DomainError::CycleDetected {
            id: "anchor".into(),
            parent_id: "box".into()
        }]
    );
    assert_eq!(outcome.state, before);
    assert_eq!(outcome.state.get("anchor").and_then(|n| n.parent_id.clone()), None);
}

#[rstest]
fn given_batch_with_unknown_id_when_patch_many_then_rest_is_applied(state: DiagramState) {
    // Arrange
    let patches = vec![
        Node::new("ghost", "note"),
        Node::new("side", "note").with_parent("root").hide(),
    ];

    // Act
    let outcome = transition(state, Mutation::PatchMany(patches), &PayloadClassifier);

    // Assert
    assert!(outcome.changed);
    assert_eq!(outcome.issues, vec![DomainError::NotFound("ghost".into())]);
    assert!(outcome.state.get("side").is_some_and(|n| n.hidden));
    assert!(outcome.state.ordered().iter().all(|n| n.id != "side"));
}

#[rstest]
fn given_leaf_marked_as_container_when_patched_then_owns_empty_child_set(state: DiagramState) {
    let (state, _) = apply(
        state,
        Mutation::PatchOne(Node::new("side", "note").with_parent("root").as_container()),
    );

    assert_eq!(state.index().children_of("side").map(|c| c.len()), Some(0));
    assert!(!state.index().pure_leaf_ids().contains("side"));
    assert!(state.index().is_consistent());
}

#[rstest]
fn given_container_with_children_when_reclassified_as_leaf_then_children_become_roots(
    state: DiagramState,
) {
    // Arrange: "inner" loses its container marker
    let demoted = Node::new("inner", "group").with_parent("root");

    // Act
    let (state, issues) = apply(state, Mutation::PatchOne(demoted));

    // Assert
    assert!(issues.is_empty());
    let index = state.index();
    assert!(index.children_of("inner").is_none());
    assert!(index.pure_leaf_ids().contains("inner"));
    assert!(in_root_bucket(&state, "leaf"));
    assert_eq!(state.get("leaf").and_then(|n| n.parent_id.clone()), None);
    assert!(index.is_consistent());
}

#[test]
fn given_index_built_incrementally_when_compared_to_rebuild_then_identical() {
    // Arrange
    let nodes = vec![
        Node::new("leaf", "note").with_parent("box"),
        group("box"),
        Node::new("other", "note"),
    ];

    // Act
    let mut incremental = DiagramState::new();
    for node in nodes.clone() {
        incremental = transition(incremental, Mutation::Insert(node), &PayloadClassifier).state;
    }
    let rebuilt = HierarchyIndex::rebuild(
        nodes.into_iter().map(Node::normalized),
        &PayloadClassifier,
    );

    // Assert
    assert_eq!(incremental.index(), &rebuilt);
}


// ============================================================
// Visibility after reattachment
// ============================================================

/// "top" is collapsed; "box" is expanded but hidden inside it.
#[fixture]
fn collapsed() -> DiagramState {
    let nodes = vec![
        group("top").expanded(false),
        group("box").with_parent("top").hide(),
        Node::new("item", "note").with_parent("box").hide(),
        Node::new("free", "note"),
    ];
    let (state, issues) = apply(DiagramState::new(), Mutation::ReplaceAll(nodes));
    assert!(issues.is_empty());
    state
}

fn is_rendered(state: &DiagramState, id: &str) -> bool {
    state.ordered().iter().any(|n| n.id == id)
}

#[rstest]
fn given_hidden_container_when_moved_to_root_then_it_and_its_contents_show(
    collapsed: DiagramState,
) {
    // Arrange
    let mut moved = collapsed.get("box").cloned().unwrap();
    moved.parent_id = None;

    // Act
    let (state, issues) = apply(collapsed, Mutation::PatchOne(moved));

    // Assert
    assert!(issues.is_empty());
    assert!(state.get("box").is_some_and(|n| !n.hidden));
    assert!(state.get("item").is_some_and(|n| !n.hidden));
    assert!(is_rendered(&state, "box"));
    assert!(is_rendered(&state, "item"));
}

#[rstest]
fn given_collapsed_container_when_reclassified_as_leaf_then_released_children_show(
    collapsed: DiagramState,
) {
    // Act
    let (state, _) = apply(collapsed, Mutation::PatchOne(Node::new("top", "group")));

    // Assert
    assert!(in_root_bucket(&state, "box"));
    assert!(state.get("box").is_some_and(|n| !n.hidden));
    assert!(state.get("item").is_some_and(|n| !n.hidden));
    assert!(is_rendered(&state, "item"));
    assert!(state.index().is_consistent());
}

#[rstest]
fn given_visible_node_when_moved_into_collapsed_container_then_hidden(collapsed: DiagramState) {
    let (state, _) = apply(
        collapsed,
        Mutation::PatchOne(Node::new("free", "note").with_parent("top")),
    );

    assert!(state.get("free").is_some_and(|n| n.hidden));
    assert!(!is_rendered(&state, "free"));
}

#[rstest]
fn given_hidden_node_when_parent_unchanged_then_hidden_flag_is_taken_as_sent(
    collapsed: DiagramState,
) {
    let mut patch = collapsed.get("item").cloned().unwrap();
    patch.hidden = false;

    let (state, _) = apply(collapsed, Mutation::PatchOne(patch));

    assert!(state.get("item").is_some_and(|n| !n.hidden));
}

// ============================================================
// Round trip after edits
// ============================================================

#[rstest]
fn given_patched_state_when_rehydrated_then_indices_are_equivalent(state: DiagramState) {
    // Arrange: move, leaf -> container, container -> leaf, dangling parent
    let patches = vec![
        Node::new("side", "note").with_parent("inner"),
        Node::new("leaf", "note").with_parent("inner").as_container(),
        Node::new("inner", "group").with_parent("root"),
        Node::new("side", "note").with_parent("ghost"),
    ];
    let mut edited = state;
    for patch in patches {
        edited = transition(edited, Mutation::PatchOne(patch), &PayloadClassifier).state;
    }
    assert!(edited.index().is_consistent());
    let json = serde_json::to_string(&edited.snapshot()).unwrap();
    let snapshot: Snapshot = serde_json::from_str(&json).unwrap();

    // Act
    let (restored, issues) = apply(DiagramState::new(), Mutation::Rehydrate(snapshot));

    // Assert
    assert!(issues.is_empty());
    assert_eq!(
        restored.index().container_children(),
        edited.index().container_children()
    );
    assert_eq!(restored.index().pure_leaf_ids(), edited.index().pure_leaf_ids());
    assert_eq!(restored.index().node_map(), edited.index().node_map());
    assert_eq!(restored.ordered(), edited.ordered());
}
