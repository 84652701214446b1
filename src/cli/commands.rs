//! Command dispatch: maps parsed arguments onto the node store and the registry

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::services::NodeStore;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::tree_view::ForestConvert;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_dir, global_config_path, local_config_path, Settings};
use crate::domain::{DomainError, Node, Registry};
use crate::infrastructure::{InfraError, ServiceContainer};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };
    let workspace = resolve_workspace(cli.workspace.as_deref())?;

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "mindgraph", &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => execute_config(command, &workspace),
        other => {
            let settings = Settings::load(Some(&workspace))?;
            let container = ServiceContainer::new(settings)?;
            execute_store_command(other, &container)
        }
    }
}

fn resolve_workspace(workspace: Option<&Path>) -> CliResult<PathBuf> {
    match workspace {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("resolve current directory", e).into()),
    }
}

fn execute_store_command(command: &Commands, container: &ServiceContainer) -> CliResult<()> {
    let registry = container.registry.as_ref();
    match command {
        Commands::Connect {
            source_type,
            source_handle,
            target_type,
            target_handle,
        } => cmd_connect(registry, source_type, source_handle, target_type, target_handle),
        Commands::Targets {
            source_type,
            source_handle,
        } => cmd_targets(registry, source_type, source_handle),
        Commands::Types => cmd_types(registry),
        _ => {
            let mut store = container.open_store();
            execute_node_command(command, &mut store, container)
        }
    }
}

fn execute_node_command(
    command: &Commands,
    store: &mut NodeStore,
    container: &ServiceContainer,
) -> CliResult<()> {
    match command {
        Commands::Tree { all } => cmd_tree(store, *all),
        Commands::Order => cmd_order(store),
        Commands::Get { id } => cmd_get(store, id),
        Commands::Add {
            node_type,
            id,
            parent,
            label,
            container: as_container,
        } => cmd_add(
            store,
            node_type,
            id.as_deref(),
            parent.as_deref(),
            label.as_deref(),
            *as_container,
        ),
        Commands::Remove { ids } => cmd_remove(store, ids),
        Commands::Move { id, parent, root } => {
            let parent = if *root { None } else { parent.as_deref() };
            if parent.is_none() && !*root {
                return Err(CliError::Usage(
                    "either a parent id or --root is required".to_string(),
                ));
            }
            cmd_move(store, id, parent)
        }
        Commands::Collapse { id } => cmd_set_expanded(store, id, false),
        Commands::Expand { id } => cmd_set_expanded(store, id, true),
        Commands::Import { file } => cmd_import(store, container, file),
        Commands::Export { output } => cmd_export(store, container, output.as_deref()),
        Commands::Reset { yes } => cmd_reset(store, *yes),
        Commands::Connect { .. }
        | Commands::Targets { .. }
        | Commands::Types
        | Commands::Config { .. }
        | Commands::Completion { .. } => Ok(()),
    }
}

// ============================================================
// Forest views
// ============================================================

fn cmd_tree(store: &NodeStore, all: bool) -> CliResult<()> {
    output::info(&store.state().index().to_tree_string(all));
    Ok(())
}

fn cmd_order(store: &NodeStore) -> CliResult<()> {
    for node in store.ordered() {
        let depth = store.depth_of(&node.id);
        output::info(&format!(
            "{:>3}  {}{} ({})",
            depth,
            "  ".repeat(depth),
            node.id,
            node.node_type
        ));
    }
    Ok(())
}

fn cmd_get(store: &NodeStore, id: &str) -> CliResult<()> {
    let node = store
        .get(id)
        .ok_or_else(|| DomainError::NotFound(id.to_string()))
        .map_err(ApplicationError::from)?;
    output::info(&to_json(node, Path::new("-"))?);
    if let Some(children) = store.children_of(id) {
        output::header(&format!("children ({})", children.len()));
        for child in children {
            output::detail(child);
        }
    }
    Ok(())
}

// ============================================================
// Mutations
// ============================================================

#[instrument(skip(store))]
fn cmd_add(
    store: &mut NodeStore,
    node_type: &str,
    id: Option<&str>,
    parent: Option<&str>,
    label: Option<&str>,
    as_container: bool,
) -> CliResult<()> {
    if store.registry().declaration(node_type).is_none() {
        output::warning(&format!("node type '{}' is not registered", node_type));
    }

    let id = id
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut node = Node::new(id.clone(), node_type);
    if let Some(parent) = parent {
        node = node.with_parent(parent);
        let parent_collapsed = store
            .get(parent)
            .filter(|_| store.state().index().is_container(parent))
            .is_some_and(|p| p.hidden || !p.is_expanded());
        if parent_collapsed {
            node = node.hide();
        }
    }
    if as_container {
        node = node.as_container();
    }
    if let Some(label) = label {
        node = node.with_field("label", Value::String(label.to_string()));
    }

    store.insert(node)?;
    output::action("Added", &id);
    Ok(())
}

fn cmd_remove(store: &mut NodeStore, ids: &[String]) -> CliResult<()> {
    let removed = store.remove(ids);
    if removed == 0 {
        output::warning("nothing removed");
    } else {
        output::action("Removed", &format!("{} node(s)", removed));
    }
    Ok(())
}

#[instrument(skip(store))]
fn cmd_move(store: &mut NodeStore, id: &str, parent: Option<&str>) -> CliResult<()> {
    let mut node = store
        .get(id)
        .cloned()
        .ok_or_else(|| DomainError::NotFound(id.to_string()))
        .map_err(ApplicationError::from)?;
    node.parent_id = parent.map(str::to_string);

    store.patch_one(node)?;
    match store.get(id).and_then(|n| n.parent_id.as_deref()) {
        Some(parent) => output::action("Moved", &format!("{} -> {}", id, parent)),
        None => output::action("Moved", &format!("{} -> root", id)),
    }
    Ok(())
}

fn cmd_set_expanded(store: &mut NodeStore, id: &str, expanded: bool) -> CliResult<()> {
    if !store.state().index().is_container(id) {
        return Err(CliError::InvalidArgs(format!("'{}' is not a container", id)));
    }
    store.set_expanded(id, expanded)?;
    let label = if expanded { "Expanded" } else { "Collapsed" };
    output::action(label, id);
    Ok(())
}

/// Accepts either a bare node list or a snapshot object with a `nodes` list.
#[instrument(skip(store, container))]
fn cmd_import(store: &mut NodeStore, container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let content = container
        .fs
        .read_to_string(file)
        .map_err(|e| InfraError::io(format!("read {}", file.display()), e))?;
    let mut value: Value = serde_json::from_str(&content).map_err(|e| InfraError::NodeFile {
        path: file.to_path_buf(),
        message: e.to_string(),
    })?;
    if let Some(nodes) = value.get_mut("nodes") {
        debug!("import: snapshot object");
        value = nodes.take();
    }

    store.set_all_json(value)?;
    output::success(&format!(
        "imported {} nodes from {}",
        store.state().index().len(),
        file.display()
    ));
    Ok(())
}

fn cmd_export(
    store: &NodeStore,
    container: &ServiceContainer,
    target: Option<&Path>,
) -> CliResult<()> {
    let path = target.unwrap_or(Path::new("-"));
    let json = to_json(&store.snapshot(), path)?;
    match target {
        Some(path) => {
            container
                .fs
                .ensure_parent(path)
                .and_then(|_| container.fs.write(path, &json))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("exported to {}", path.display()));
        }
        None => output::info(&json),
    }
    Ok(())
}

fn cmd_reset(store: &mut NodeStore, yes: bool) -> CliResult<()> {
    if !yes && !confirm("Replace all nodes with the defaults?")? {
        output::info("aborted");
        return Ok(());
    }
    store.reset()?;
    output::success("restored default nodes");
    Ok(())
}

// ============================================================
// Registry
// ============================================================

fn cmd_connect(
    registry: &Registry,
    source_type: &str,
    source_handle: &str,
    target_type: &str,
    target_handle: &str,
) -> CliResult<()> {
    let kind = registry
        .can_connect(source_type, source_handle, target_type, target_handle)
        .map_err(ApplicationError::from)?;
    output::success(&format!(
        "{}.{} -> {}.{} ({})",
        source_type, source_handle, target_type, target_handle, kind
    ));
    Ok(())
}

fn cmd_targets(registry: &Registry, source_type: &str, source_handle: &str) -> CliResult<()> {
    let targets = registry
        .compatible_targets(source_type, source_handle)
        .map_err(ApplicationError::from)?;
    if targets.is_empty() {
        output::warning(&format!("{}.{} reaches nothing", source_type, source_handle));
    }
    for category in targets {
        output::info(&category);
    }
    Ok(())
}

fn cmd_types(registry: &Registry) -> CliResult<()> {
    for declaration in registry.declarations() {
        let marker = if declaration.container { " [container]" } else { "" };
        output::header(&format!(
            "{} ({}){}",
            declaration.node_type, declaration.category, marker
        ));
        for handle in &declaration.handles {
            let accepts = handle
                .accepts
                .as_ref()
                .map(|a| a.join(","))
                .unwrap_or_else(|| "*".to_string());
            output::detail(&format!(
                "{:<8} {:?} {} accepts={} data={}",
                handle.id, handle.position, handle.direction, accepts, handle.data_type
            ));
        }
    }
    Ok(())
}

// ============================================================
// Config
// ============================================================

fn execute_config(command: &ConfigCommands, workspace: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(Some(workspace))?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(workspace)
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
            }
            std::fs::write(&path, Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Created", &path.display());
            Ok(())
        }
        ConfigCommands::Path => {
            let global = global_config_dir()
                .map(|d| d.join("mindgraph.toml").display().to_string())
                .unwrap_or_else(|| "(unavailable)".to_string());
            output::info(&format!("global: {}", global));
            output::info(&format!("local:  {}", local_config_path(workspace).display()));
            Ok(())
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn to_json<T: serde::Serialize + ?Sized>(value: &T, path: &Path) -> CliResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| {
        InfraError::NodeFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
        .into()
    })
}

fn confirm(question: &str) -> CliResult<bool> {
    output::prompt(&format!("{} [y/N]", question));
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| InfraError::io("read confirmation", e))?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
