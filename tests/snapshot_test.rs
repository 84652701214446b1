//! Tests for SnapshotRepository

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use mindgraph::application::{ApplicationError, SnapshotRepository};
use mindgraph::domain::{Node, Snapshot};
use mindgraph::infrastructure::traits::RealFileSystem;

fn repo(temp: &TempDir, name: &str) -> SnapshotRepository {
    SnapshotRepository::new(Arc::new(RealFileSystem), temp.path().join(name))
}

#[test]
fn given_missing_file_when_load_then_returns_none() {
    let temp = TempDir::new().unwrap();

    let loaded = repo(&temp, "absent.json").load().unwrap();

    assert!(loaded.is_none());
}

#[test]
fn given_snapshot_when_saved_then_parent_dirs_are_created_and_no_temp_file_remains() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let repository = SnapshotRepository::new(
        Arc::new(RealFileSystem),
        temp.path().join("nested").join("deeper").join("nodes.json"),
    );
    let snapshot = Snapshot::new(vec![Node::new("a", "note").expanded(false)]);

    // Act
    repository.save(&snapshot).unwrap();

    // Assert
    assert!(repository.path().exists());
    assert!(!repository.path().with_extension("json.tmp").exists());
    assert_eq!(repository.load().unwrap(), Some(snapshot));
}

#[test]
fn given_stored_nodes_without_expanded_when_load_then_nodes_are_normalized() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let repository = repo(&temp, "nodes.json");
    let body = json!({ "nodes": [
        { "id": "g", "type": "group", "data": { "isParent": true } },
        { "id": "n", "type": "note", "parentId": "g", "hidden": true }
    ]});
    std::fs::write(repository.path(), body.to_string()).unwrap();

    // Act
    let loaded = repository.load().unwrap().unwrap();

    // Assert
    assert_eq!(loaded.nodes.len(), 2);
    assert!(loaded.nodes.iter().all(|n| n.data.expanded == Some(false)));
    assert!(loaded.nodes[1].hidden);
    assert_eq!(loaded.nodes[1].parent_id.as_deref(), Some("g"));
}

#[test]
fn given_invalid_json_when_load_then_snapshot_error_names_the_file() {
    let temp = TempDir::new().unwrap();
    let repository = repo(&temp, "broken.json");
    std::fs::write(repository.path(), "[1, 2").unwrap();

    let result = repository.load();

    match result {
        Err(ApplicationError::Snapshot { path, .. }) => assert_eq!(path, repository.path()),
        other => panic!("expected snapshot error, got {:?}", other),
    }
}
