//! Command dispatch

use std::io;

use clap::CommandFactory;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::services::{DeviceNode, RemovalOutcome, RemovalReport, SummaryLine};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let command = cli
        .command
        .as_ref()
        .ok_or_else(|| CliError::Usage("no command given, see --help".to_string()))?;

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.storage_dir {
        settings.storage_dir = dir.clone();
    }
    debug!("settings: {:?}", settings);
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Remove {
            name,
            dry_run,
            no_backup,
        } => cmd_remove(&container, name, *dry_run, *no_backup),
        Commands::Show { name } => cmd_show(&container, name),
        Commands::Shared => cmd_shared(&container),
        Commands::Config { command } => cmd_config(&container, command),
        Commands::Completion { .. } => Ok(()),
    }
}

#[instrument(skip(container))]
fn cmd_remove(
    container: &ServiceContainer,
    name: &str,
    dry_run: bool,
    no_backup: bool,
) -> CliResult<()> {
    output::info(&format!("Input: {}", name));
    let snapshot = container.registry.load()?;

    let report = match container.removal.remove(snapshot, name)? {
        RemovalOutcome::Removed(report) => report,
        RemovalOutcome::NotFound { target, .. } => return Err(CliError::TargetNotFound(target)),
    };
    print_report(&report);

    if dry_run {
        output::warning("dry run, no registry written");
        return Ok(());
    }

    let backup = container.settings.backup && !no_backup;
    let saved = container.registry.save(&report.snapshot, backup)?;
    for path in &saved.backups {
        output::action("Backup", &path.display());
    }
    for path in &saved.written {
        output::success(&path.display());
    }
    Ok(())
}

fn print_report(report: &RemovalReport) {
    for shared in &report.shared_config_entries {
        output::warning(&format!(
            "config entry \"{}\" is referenced from {} devices",
            shared.entry_id, shared.device_count
        ));
    }
    print_section("Devices to remove:", &report.devices);
    print_section("Config Entries to remove:", &report.config_entries);
    print_section("Entities to remove:", &report.entities);
}

fn print_section(title: &str, lines: &[SummaryLine]) {
    output::header(title);
    if lines.is_empty() {
        output::detail("(none)");
    }
    for line in lines {
        output::removal(line);
    }
}

#[instrument(skip(container))]
fn cmd_show(container: &ServiceContainer, name: &str) -> CliResult<()> {
    let snapshot = container.registry.load()?;
    let nodes = container
        .removal
        .preview(&snapshot, name)?
        .ok_or_else(|| CliError::TargetNotFound(name.to_string()))?;
    if let Some(tree) = render_tree(&nodes) {
        output::info(&tree);
    }
    Ok(())
}

/// Build a display tree from a pre-order list of devices.
fn render_tree(nodes: &[DeviceNode]) -> Option<Tree<String>> {
    fn attach(stack: &mut Vec<Tree<String>>) -> Option<Tree<String>> {
        let done = stack.pop()?;
        match stack.last_mut() {
            Some(parent) => {
                parent.push(done);
                None
            }
            None => Some(done),
        }
    }

    let mut stack: Vec<Tree<String>> = Vec::new();
    for node in nodes {
        while stack.len() > node.depth {
            if let Some(root) = attach(&mut stack) {
                return Some(root);
            }
        }
        stack.push(Tree::new(format!(
            "{} ({}) [{} entities]",
            node.name, node.id, node.entity_count
        )));
    }
    while !stack.is_empty() {
        if let Some(root) = attach(&mut stack) {
            return Some(root);
        }
    }
    None
}

#[instrument(skip(container))]
fn cmd_shared(container: &ServiceContainer) -> CliResult<()> {
    let snapshot = container.registry.load()?;
    let shared = container.removal.shared_config_entries(&snapshot)?;
    if shared.is_empty() {
        output::info("No config entry is shared by several devices");
    }
    for entry in shared {
        output::detail(&format!("{}: {} devices", entry.entry_id, entry.device_count));
    }
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::info(&path.display()),
            None => {
                return Err(CliError::Usage(
                    "cannot determine config directory".to_string(),
                ))
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, depth: usize) -> DeviceNode {
        DeviceNode {
            id: id.to_string(),
            name: id.to_uppercase(),
            depth,
            entity_count: 0,
        }
    }

    #[test]
    fn given_preorder_nodes_when_rendering_then_nests_by_depth() {
        let nodes = vec![node("r", 0), node("a", 1), node("a1", 2), node("b", 1)];

        let tree = render_tree(&nodes).unwrap();

        assert_eq!(tree.root, "R (r) [0 entities]");
        assert_eq!(tree.leaves.len(), 2);
        assert_eq!(tree.leaves[0].leaves.len(), 1);
        assert_eq!(tree.leaves[1].root, "B (b) [0 entities]");
    }

    #[test]
    fn given_no_nodes_when_rendering_then_none() {
        assert!(render_tree(&[]).is_none());
    }
}
