//! CLI argument definitions for Graft.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "graft",
    version,
    about = "Resolve and inspect dependency graphs",
    long_about = "Graft resolves the configurations of a project declared in Graft.toml \
                  against a component repository, resolving version conflicts and \
                  applying exclusions along the way."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to Graft.toml (defaults to the nearest one above the current directory)
    #[arg(long, global = true)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a configuration and list the selected modules
    Resolve {
        /// Configuration to resolve
        #[arg(short, long)]
        configuration: Option<String>,
        /// Fail on the first version conflict
        #[arg(long)]
        strict: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the dependency tree
    Tree {
        /// Configuration to resolve
        #[arg(short, long)]
        configuration: Option<String>,
        /// Maximum depth
        #[arg(long)]
        depth: Option<u32>,
        /// Show what depends on the module given with --why
        #[arg(long, requires = "why")]
        inverted: bool,
        /// Explain why a module is included (group:name or name)
        #[arg(long)]
        why: Option<String>,
        /// Show version conflicts
        #[arg(long)]
        conflicts: bool,
    },

    /// Write Graft.lock for a configuration
    Lock {
        /// Configuration to lock
        #[arg(short, long)]
        configuration: Option<String>,
    },

    /// List the artifact files of a configuration
    Files {
        /// Configuration to resolve
        #[arg(short, long)]
        configuration: Option<String>,
    },
}

/// Parse command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}
