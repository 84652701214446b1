//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Mind-map forest manager: containment hierarchy, expand/collapse cascades and typed connections
#[derive(Parser, Debug)]
#[command(name = "mindgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Workspace directory holding a local .mindgraph.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the containment forest
    Tree {
        /// Include hidden nodes
        #[arg(short, long)]
        all: bool,
    },

    /// List visible nodes in render order
    Order,

    /// Show one node as JSON
    Get {
        /// Node id
        id: String,
    },

    /// Add a node
    Add {
        /// Node type (see `mindgraph types`)
        node_type: String,
        /// Node id (default: generated)
        #[arg(long)]
        id: Option<String>,
        /// Containing node
        #[arg(short, long)]
        parent: Option<String>,
        /// Label stored in the payload
        #[arg(short, long)]
        label: Option<String>,
        /// Mark as container through the payload
        #[arg(long)]
        container: bool,
    },

    /// Remove nodes and everything they contain
    Remove {
        /// Node ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Move a node into another container
    Move {
        /// Node id
        id: String,
        /// New containing node
        #[arg(conflicts_with = "root")]
        parent: Option<String>,
        /// Detach to root level
        #[arg(long)]
        root: bool,
    },

    /// Collapse a container and hide its contents
    Collapse {
        /// Container id
        id: String,
    },

    /// Expand a container and show its contents
    Expand {
        /// Container id
        id: String,
    },

    /// Replace all nodes from a JSON file
    Import {
        /// JSON file holding a node list or a snapshot
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Write all nodes as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Restore the built-in default nodes
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Check whether two handles can be connected
    Connect {
        /// Source node type
        source_type: String,
        /// Source handle id
        source_handle: String,
        /// Target node type
        target_type: String,
        /// Target handle id
        target_handle: String,
    },

    /// List node types a handle may connect to
    Targets {
        /// Source node type
        source_type: String,
        /// Source handle id
        source_handle: String,
    },

    /// List registered node types and their handles
    Types,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
