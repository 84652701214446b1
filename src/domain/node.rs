//! Node entity: the unit of the diagram forest

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the synthetic bucket in `container_children` that holds root-level ids.
pub const NO_PARENT: &str = "no-parent";

/// Opaque per-node payload.
///
/// Only `expanded` and `isParent` are interpreted by the engine; every other key is kept
/// verbatim for the type-specific form layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Whether a container shows its children. Normalized to `Some(_)` on storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    /// Payload-level container marker, used when the node type itself is not a container.
    #[serde(default, rename = "isParent", skip_serializing_if = "Option::is_none")]
    pub is_parent: Option<bool>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A node of the diagram forest.
///
/// `parent_id` is visual containment, not inheritance. `hidden` only removes the node
/// from the render order; it stays indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub hidden: bool,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            parent_id: None,
            data: NodeData::default(),
            hidden: false,
        }
    }

    /// Builder: set the containing node.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Builder: mark the node as a container through its payload.
    pub fn as_container(mut self) -> Self {
        self.data.is_parent = Some(true);
        self
    }

    /// Builder: set the `expanded` flag.
    pub fn expanded(mut self, expanded: bool) -> Self {
        self.data.expanded = Some(expanded);
        self
    }

    /// Builder: start out hidden, e.g. inside a collapsed container.
    pub fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Builder: set an arbitrary payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.fields.insert(key.into(), value);
        self
    }

    pub fn is_expanded(&self) -> bool {
        self.data.expanded.unwrap_or(false)
    }

    /// Payload-level container marker.
    pub fn is_parent_marked(&self) -> bool {
        self.data.is_parent.unwrap_or(false)
    }

    /// Give `expanded` a concrete value (default false).
    pub fn normalized(mut self) -> Self {
        self.data.expanded = Some(self.is_expanded());
        self
    }

    /// Ids that cannot be stored: empty, or colliding with the root bucket key.
    pub fn has_reserved_id(&self) -> bool {
        self.id.is_empty() || self.id == NO_PARENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_node_without_expanded_when_normalized_then_expanded_is_false() {
        let node = Node::new("a", "note").normalized();
        assert_eq!(node.data.expanded, Some(false));
    }

    #[test]
    fn given_json_payload_when_deserialized_then_unknown_fields_are_kept() {
        let value = json!({
            "id": "api",
            "type": "datanode",
            "parentId": "group-1",
            "data": { "expanded": true, "method": "GET", "url": "/users" }
        });

        let node: Node = serde_json::from_value(value).unwrap();

        assert_eq!(node.parent_id.as_deref(), Some("group-1"));
        assert!(node.is_expanded());
        assert!(!node.hidden);
        assert_eq!(node.data.fields.get("method"), Some(&json!("GET")));
    }

    #[test]
    fn given_node_when_serialized_then_uses_camel_case_keys() {
        let node = Node::new("g", "group").with_parent("root").as_container();
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["parentId"], json!("root"));
        assert_eq!(value["type"], json!("group"));
        assert_eq!(value["data"]["isParent"], json!(true));
    }

    #[test]
    fn given_no_parent_id_when_checked_then_is_reserved() {
        assert!(Node::new(NO_PARENT, "note").has_reserved_id());
        assert!(Node::new("", "note").has_reserved_id());
        assert!(!Node::new("n1", "note").has_reserved_id());
    }
}
