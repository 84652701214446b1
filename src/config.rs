//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mindgraph/mindgraph.toml`
//! 3. Local config: `<workspace>/.mindgraph.toml`
//! 4. Environment variables: `MINDGRAPH_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::{ApplicationError, IoResultExt};
use crate::domain::{Registry, TypeDeclaration};
use crate::infrastructure::traits::FileSystem;

/// Default storage key: file stem of the snapshot inside `data_dir`.
pub const DEFAULT_STORAGE_KEY: &str = "mindgraph-nodes";

/// Unified configuration for mindgraph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the snapshot (default: ~/.mindgraph)
    pub data_dir: PathBuf,
    /// Snapshot file stem (default: mindgraph-nodes)
    pub storage_key: String,
    /// TOML file with node-type declarations (default: built-in types)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: dirs_default_data_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            registry_file: None,
        }
    }
}

/// Raw settings for intermediate parsing: `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub storage_key: Option<String>,
    pub registry_file: Option<PathBuf>,
}

/// Get the default data directory (~/.mindgraph).
fn dirs_default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".mindgraph"))
        .unwrap_or_else(|| PathBuf::from("~/.mindgraph"))
}

/// Get the XDG config directory for mindgraph.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mindgraph").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mindgraph.toml"))
}

/// Get the path to the local config file in a workspace directory.
pub fn local_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".mindgraph.toml")
}

/// Expand `~`, `$VAR` and `${VAR}`; the input is returned unchanged when expansion fails.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Path of the persisted snapshot: `<data_dir>/<storage_key>.json`.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.storage_key))
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.data_dir.to_string_lossy().as_ref());
        self.data_dir = PathBuf::from(expanded);

        if let Some(registry_file) = &self.registry_file {
            let expanded = expand_env_vars(registry_file.to_string_lossy().as_ref());
            self.registry_file = Some(PathBuf::from(expanded));
        }
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            storage_key: overlay
                .storage_key
                .clone()
                .unwrap_or_else(|| self.storage_key.clone()),
            registry_file: overlay
                .registry_file
                .clone()
                .or_else(|| self.registry_file.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `workspace` - Optional directory holding a local `.mindgraph.toml`
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/mindgraph/mindgraph.toml`
    /// 3. Local config: `<workspace>/.mindgraph.toml`
    /// 4. Environment variables: `MINDGRAPH_*` prefix
    pub fn load(workspace: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(workspace) = workspace {
            let local_path = local_config_path(workspace);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply MINDGRAPH_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("MINDGRAPH").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("storage_key") {
            settings.storage_key = val;
        }
        if let Ok(val) = config.get_string("registry_file") {
            settings.registry_file = Some(PathBuf::from(val));
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# mindgraph configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mindgraph/mindgraph.toml
#   Local:  <workspace>/.mindgraph.toml
#   Env:    MINDGRAPH_* environment variables (e.g. MINDGRAPH_STORAGE_KEY)

# Directory holding the node snapshot
# data_dir = "~/.mindgraph"

# Snapshot file stem: <data_dir>/<storage_key>.json
# storage_key = "mindgraph-nodes"

# Node-type declarations (built-in types when unset)
# registry_file = "~/.mindgraph/types.toml"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// On-disk shape of a node-type declaration file.
///
/// ```toml
/// [[types]]
/// type = "datanode"
/// category = "data"
///
/// [[types.handles]]
/// id = "right"
/// position = "right"
/// direction = "outgoing"
/// accepts = ["view"]
/// connection_kind = "package"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryFile {
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
}

/// Parse node-type declarations from TOML text.
pub fn parse_registry(content: &str) -> Result<Registry, ApplicationError> {
    let file: RegistryFile = toml::from_str(content).map_err(|e| ApplicationError::Config {
        message: format!("parse node types: {e}"),
    })?;
    Ok(Registry::from_declarations(file.types))
}

/// Load node-type declarations from a TOML file.
pub fn load_registry(fs: &dyn FileSystem, path: &Path) -> Result<Registry, ApplicationError> {
    let content = fs
        .read_to_string(path)
        .with_path_context("read node types", path)?;
    parse_registry(&content).map_err(|e| ApplicationError::Config {
        message: format!("{}: {}", path.display(), e),
    })
}
