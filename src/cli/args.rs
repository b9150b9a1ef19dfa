//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Remove a device and everything depending on it from Home Assistant's registries
#[derive(Parser, Debug)]
#[command(name = "hass-prune")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Home Assistant .storage directory (default: ./.storage)
    #[arg(short, long, global = true, value_hint = ValueHint::DirPath)]
    pub storage_dir: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/hass-prune/hass-prune.toml)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove a device, its descendants, orphaned config entries and entities
    Remove {
        /// Device name or user-assigned name
        name: String,
        /// Report what would be removed without writing
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Do not keep a backup of the registry files
        #[arg(long)]
        no_backup: bool,
    },

    /// Show the device tree a removal would take out
    Show {
        /// Device name or user-assigned name
        name: String,
    },

    /// List config entries shared by several devices
    Shared,

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

    /// Show config path
    Path,
}
