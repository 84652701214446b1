//! Application layer: node store, snapshot persistence and bootstrap defaults
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod defaults;
pub mod error;
pub mod error_ext;
pub mod services;
pub mod snapshot;

pub use defaults::{default_nodes, default_registry};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use snapshot::SnapshotRepository;
