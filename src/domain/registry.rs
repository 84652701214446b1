//! Node-type registry: handle declarations, container flags and connection validation.
//!
//! One instance is built at startup and shared by reference with everything that needs
//! to classify nodes or validate connections.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::ConnectionError;
use crate::domain::index::ContainerClassifier;
use crate::domain::node::Node;

/// Connection kind used when neither handle declares one.
pub const DEFAULT_CONNECTION_KIND: &str = "default";

/// Side of the node a handle is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlePosition {
    Top,
    Right,
    Bottom,
    Left,
}

/// Which ends of a connection a handle may serve as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleDirection {
    Outgoing,
    Incoming,
    Both,
}

impl HandleDirection {
    pub fn can_send(self) -> bool {
        matches!(self, HandleDirection::Outgoing | HandleDirection::Both)
    }

    pub fn can_receive(self) -> bool {
        matches!(self, HandleDirection::Incoming | HandleDirection::Both)
    }
}

impl fmt::Display for HandleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandleDirection::Outgoing => "outgoing",
            HandleDirection::Incoming => "incoming",
            HandleDirection::Both => "both",
        };
        write!(f, "{}", s)
    }
}

/// A named attachment point on a node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleSpec {
    pub id: String,
    pub position: HandlePosition,
    pub direction: HandleDirection,
    /// Data-flow category carried through this handle.
    #[serde(default = "default_data_type")]
    pub data_type: String,
    /// Node categories allowed on the other end; `None` accepts any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepts: Option<Vec<String>>,
    /// Connection kind produced by connections through this handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_kind: Option<String>,
}

fn default_data_type() -> String {
    "any".to_string()
}

impl HandleSpec {
    pub fn new(id: impl Into<String>, position: HandlePosition, direction: HandleDirection) -> Self {
        Self {
            id: id.into(),
            position,
            direction,
            data_type: default_data_type(),
            accepts: None,
            connection_kind: None,
        }
    }

    pub fn outgoing(id: impl Into<String>, position: HandlePosition) -> Self {
        Self::new(id, position, HandleDirection::Outgoing)
    }

    pub fn incoming(id: impl Into<String>, position: HandlePosition) -> Self {
        Self::new(id, position, HandleDirection::Incoming)
    }

    pub fn both(id: impl Into<String>, position: HandlePosition) -> Self {
        Self::new(id, position, HandleDirection::Both)
    }

    /// Builder: restrict the partner node categories.
    pub fn accepting<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepts = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn carrying(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.connection_kind = Some(kind.into());
        self
    }

    fn allows(&self, category: &str) -> bool {
        self.accepts
            .as_ref()
            .map_or(true, |allowed| allowed.iter().any(|c| c == category))
    }
}

/// Everything the registry knows about one node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    #[serde(rename = "type")]
    pub node_type: String,
    pub category: String,
    /// Nodes of this type are containers regardless of their payload.
    #[serde(default)]
    pub container: bool,
    #[serde(default)]
    pub handles: Vec<HandleSpec>,
}

impl TypeDeclaration {
    pub fn handle(&self, id: &str) -> Option<&HandleSpec> {
        self.handles.iter().find(|h| h.id == id)
    }
}

/// Registry of node-type declarations.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, TypeDeclaration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_declarations(declarations: impl IntoIterator<Item = TypeDeclaration>) -> Self {
        let mut registry = Self::new();
        for declaration in declarations {
            registry.register(declaration);
        }
        registry
    }

    /// Declare a node type. Registering the same type again replaces the declaration.
    pub fn register_type(
        &mut self,
        node_type: impl Into<String>,
        category: impl Into<String>,
        handles: Vec<HandleSpec>,
    ) {
        self.register(TypeDeclaration {
            node_type: node_type.into(),
            category: category.into(),
            container: false,
            handles,
        });
    }

    /// Declare a node type whose nodes are always containers.
    pub fn register_container_type(
        &mut self,
        node_type: impl Into<String>,
        category: impl Into<String>,
        handles: Vec<HandleSpec>,
    ) {
        self.register(TypeDeclaration {
            node_type: node_type.into(),
            category: category.into(),
            container: true,
            handles,
        });
    }

    pub fn register(&mut self, declaration: TypeDeclaration) {
        let node_type = declaration.node_type.clone();
        if self.types.insert(node_type.clone(), declaration).is_some() {
            debug!("register: replaced declaration of {}", node_type);
        }
    }

    pub fn declaration(&self, node_type: &str) -> Option<&TypeDeclaration> {
        self.types.get(node_type)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.types.values()
    }

    pub fn category_of(&self, node_type: &str) -> Option<&str> {
        self.types.get(node_type).map(|d| d.category.as_str())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn resolve(
        &self,
        node_type: &str,
        handle: &str,
    ) -> Result<(&TypeDeclaration, &HandleSpec), ConnectionError> {
        let declaration = self
            .types
            .get(node_type)
            .ok_or_else(|| ConnectionError::TypeNotFound(node_type.to_string()))?;
        let spec = declaration
            .handle(handle)
            .ok_or_else(|| ConnectionError::HandleNotFound {
                node_type: node_type.to_string(),
                handle: handle.to_string(),
            })?;
        Ok((declaration, spec))
    }

    /// Validate a connection from `source_type.source_handle` to
    /// `target_type.target_handle` and return its connection kind.
    ///
    /// Checks run in order: both ends resolvable, source allow-list, target allow-list,
    /// direction.
    #[instrument(level = "debug", skip(self))]
    pub fn can_connect(
        &self,
        source_type: &str,
        source_handle: &str,
        target_type: &str,
        target_handle: &str,
    ) -> Result<String, ConnectionError> {
        let (source, source_spec) = self.resolve(source_type, source_handle)?;
        let (target, target_spec) = self.resolve(target_type, target_handle)?;

        if !source_spec.allows(&target.category) {
            return Err(ConnectionError::RejectedBySource {
                handle: source_spec.id.clone(),
                category: target.category.clone(),
            });
        }
        if !target_spec.allows(&source.category) {
            return Err(ConnectionError::RejectedByTarget {
                handle: target_spec.id.clone(),
                category: source.category.clone(),
            });
        }
        if !source_spec.direction.can_send() || !target_spec.direction.can_receive() {
            return Err(ConnectionError::InvalidDirection {
                source_handle: format!("{}.{}", source_type, source_spec.id),
                source_direction: source_spec.direction.to_string(),
                target_handle: format!("{}.{}", target_type, target_spec.id),
                target_direction: target_spec.direction.to_string(),
            });
        }

        Ok(source_spec
            .connection_kind
            .clone()
            .or_else(|| target_spec.connection_kind.clone())
            .unwrap_or_else(|| DEFAULT_CONNECTION_KIND.to_string()))
    }

    /// Connection kind for a proposed connection, the default kind when it is invalid.
    pub fn edge_kind_for_connection(
        &self,
        source_type: &str,
        source_handle: &str,
        target_type: &str,
        target_handle: &str,
    ) -> String {
        self.can_connect(source_type, source_handle, target_type, target_handle)
            .unwrap_or_else(|_| DEFAULT_CONNECTION_KIND.to_string())
    }

    /// Node categories reachable from an outgoing handle.
    ///
    /// A category is reachable when some registered handle of that category accepts a
    /// connection from this handle. Incoming-only handles reach nothing.
    pub fn compatible_targets(
        &self,
        source_type: &str,
        source_handle: &str,
    ) -> Result<BTreeSet<String>, ConnectionError> {
        let (_, spec) = self.resolve(source_type, source_handle)?;
        if !spec.direction.can_send() {
            return Ok(BTreeSet::new());
        }

        Ok(self
            .types
            .values()
            .filter(|target| {
                target.handles.iter().any(|h| {
                    self.can_connect(source_type, source_handle, &target.node_type, &h.id)
                        .is_ok()
                })
            })
            .map(|target| target.category.clone())
            .collect())
    }
}

impl ContainerClassifier for Registry {
    /// Container when the type is declared as one, else by the payload marker.
    fn is_container(&self, node: &Node) -> bool {
        self.types
            .get(&node.node_type)
            .is_some_and(|d| d.container)
            || node.is_parent_marked()
    }
}
