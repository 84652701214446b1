//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent rejected or corrected mutation requests.
/// They are returned as values alongside the resulting state, never raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("node not found: {0}")]
    NotFound(String),

    #[error("parent {parent_id} of node {id} does not exist, node demoted to root")]
    DanglingParent { id: String, parent_id: String },

    #[error("cycle detected: {id} cannot be contained by {parent_id}")]
    CycleDetected { id: String, parent_id: String },

    #[error("reserved node id: {0:?}")]
    ReservedId(String),
}

impl DomainError {
    /// Corrections were applied to the state; everything else left it untouched.
    pub fn is_correction(&self) -> bool {
        matches!(self, DomainError::DanglingParent { .. })
    }
}

/// Reasons a proposed connection between two handles is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("node type not found: {0}")]
    TypeNotFound(String),

    #[error("handle not found: {node_type}.{handle}")]
    HandleNotFound { node_type: String, handle: String },

    #[error("source handle {handle} does not accept target category {category}")]
    RejectedBySource { handle: String, category: String },

    #[error("target handle {handle} does not accept source category {category}")]
    RejectedByTarget { handle: String, category: String },

    #[error("invalid direction: {source_handle} ({source_direction}) cannot connect to {target_handle} ({target_direction})")]
    InvalidDirection {
        source_handle: String,
        source_direction: String,
        target_handle: String,
        target_direction: String,
    },
}
