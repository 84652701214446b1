//! Snapshot persistence: the flat node list as JSON under a fixed storage key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::error_ext::{IoResultExt, JsonResultExt};
use crate::application::ApplicationResult;
use crate::domain::Snapshot;
use crate::infrastructure::traits::FileSystem;

/// Reads and writes the persisted snapshot file.
pub struct SnapshotRepository {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl SnapshotRepository {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored snapshot, `Ok(None)` when nothing was stored yet.
    ///
    /// Nodes come back normalized; derived fields that may have been stored alongside the
    /// node list are ignored.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> ApplicationResult<Option<Snapshot>> {
        if !self.fs.exists(&self.path) {
            debug!("load: no snapshot stored");
            return Ok(None);
        }
        let content = self
            .fs
            .read_to_string(&self.path)
            .with_path_context("read snapshot", &self.path)?;
        let snapshot: Snapshot = serde_json::from_str(&content).for_snapshot(&self.path)?;
        debug!("load: {} nodes", snapshot.nodes.len());
        Ok(Some(snapshot.normalized()))
    }

    /// Write the snapshot through a temporary file so readers never see a partial file.
    #[instrument(level = "debug", skip(self, snapshot), fields(path = %self.path.display()))]
    pub fn save(&self, snapshot: &Snapshot) -> ApplicationResult<()> {
        let content = serde_json::to_string_pretty(snapshot).for_snapshot(&self.path)?;
        let tmp = self.path.with_extension("json.tmp");

        self.fs
            .ensure_parent(&self.path)
            .with_path_context("create snapshot directory", &self.path)?;
        self.fs
            .write(&tmp, &content)
            .with_path_context("write snapshot", &tmp)?;
        self.fs
            .rename(&tmp, &self.path)
            .with_path_context("replace snapshot", &self.path)?;
        debug!("save: {} nodes", snapshot.nodes.len());
        Ok(())
    }
}
