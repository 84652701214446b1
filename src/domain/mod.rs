//! Domain layer: node forest, derived indices and connection rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod cascade;
pub mod error;
pub mod index;
pub mod node;
pub mod ordering;
pub mod registry;
pub mod snapshot;
pub mod transition;

pub use cascade::{propagate_visibility, remove_subtrees};
pub use error::{ConnectionError, DomainError};
pub use index::{ContainerClassifier, HierarchyIndex, PayloadClassifier};
pub use node::{Node, NodeData, NO_PARENT};
pub use ordering::{depth_of, organize_containers, render_order};
pub use registry::{
    HandleDirection, HandlePosition, HandleSpec, Registry, TypeDeclaration,
    DEFAULT_CONNECTION_KIND,
};
pub use snapshot::Snapshot;
pub use transition::{transition, DiagramState, Mutation, Transition};
