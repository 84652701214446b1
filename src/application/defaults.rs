//! Built-in content: the starter mind map and the standard node types.

use serde_json::json;

use crate::domain::{HandlePosition, HandleSpec, Node, Registry};

/// Node list used when no snapshot is stored or the stored one cannot be read.
pub fn default_nodes() -> Vec<Node> {
    vec![
        Node::new("root", "group")
            .as_container()
            .expanded(true)
            .with_field("label", json!("Workspace")),
        Node::new("ideas", "group")
            .with_parent("root")
            .expanded(true)
            .with_field("label", json!("Ideas")),
        Node::new("idea-1", "note")
            .with_parent("ideas")
            .with_field("label", json!("Collect requirements")),
        Node::new("idea-2", "note")
            .with_parent("ideas")
            .with_field("label", json!("Sketch the data flow")),
        Node::new("sources", "group")
            .with_parent("root")
            .expanded(false)
            .with_field("label", json!("Sources")),
        Node::new("users-api", "datanode")
            .with_parent("sources")
            .hide()
            .with_field("method", json!("GET"))
            .with_field("url", json!("https://example.com/api/users")),
        Node::new("users-table", "viewnode")
            .with_parent("root")
            .with_field("chartType", json!("table")),
    ]
}

/// Standard node types.
///
/// `datanode` feeds `viewnode` through its right handle (`package` connections),
/// `group` nodes are containers, `note` attaches to anything.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();

    registry.register_type(
        "datanode",
        "data",
        vec![
            HandleSpec::outgoing("right", HandlePosition::Right)
                .carrying("records")
                .accepting(["view"])
                .with_kind("package"),
            HandleSpec::outgoing("bottom", HandlePosition::Bottom).carrying("records"),
            HandleSpec::incoming("left", HandlePosition::Left).carrying("trigger"),
            HandleSpec::incoming("top", HandlePosition::Top).carrying("trigger"),
        ],
    );
    registry.register_type(
        "viewnode",
        "view",
        vec![
            HandleSpec::incoming("left", HandlePosition::Left)
                .carrying("records")
                .accepting(["data"]),
            HandleSpec::incoming("top", HandlePosition::Top),
            HandleSpec::outgoing("right", HandlePosition::Right)
                .accepting(["view"])
                .with_kind("link"),
        ],
    );
    registry.register_container_type(
        "group",
        "layout",
        vec![HandleSpec::both("edge", HandlePosition::Bottom).accepting(["layout"])],
    );
    registry.register_type(
        "note",
        "annotation",
        vec![HandleSpec::both("edge", HandlePosition::Left).with_kind("annotation")],
    );

    registry
}
