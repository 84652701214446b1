//! Service container for dependency injection
//!
//! Wires up the registry, the snapshot repository and the node store.

use std::sync::Arc;

use tracing::info;

use crate::application::services::NodeStore;
use crate::application::{default_registry, ApplicationResult, SnapshotRepository};
use crate::config::{load_registry, Settings};
use crate::domain::Registry;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding the shared application services.
///
/// The registry is built once here and handed to every consumer by reference.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Node-type declarations
    pub registry: Arc<Registry>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> ApplicationResult<Self> {
        let registry = match &settings.registry_file {
            Some(path) => {
                info!("loading node types from {}", path.display());
                load_registry(fs.as_ref(), path)?
            }
            None => default_registry(),
        };

        Ok(Self {
            settings: Arc::new(settings),
            fs,
            registry: Arc::new(registry),
        })
    }

    pub fn snapshot_repository(&self) -> SnapshotRepository {
        SnapshotRepository::new(Arc::clone(&self.fs), self.settings.snapshot_path())
    }

    /// Node store rehydrated from the configured snapshot.
    pub fn open_store(&self) -> NodeStore {
        NodeStore::open(Arc::clone(&self.registry), self.snapshot_repository())
    }
}
