//! Command dispatch and handler modules.

mod files;
mod lock;
mod resolve;
mod tree;

use graft_resolver::resolver::Project;
use graft_util::errors::GraftError;
use miette::Result;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let manifest_path = cli.manifest_path.as_deref();
    match cli.command {
        Command::Resolve {
            configuration,
            strict,
            json,
        } => resolve::exec(manifest_path, configuration.as_deref(), strict, json),
        Command::Tree {
            configuration,
            depth,
            inverted,
            why,
            conflicts,
        } => tree::exec(
            manifest_path,
            configuration.as_deref(),
            depth,
            inverted,
            why.as_deref(),
            conflicts,
        ),
        Command::Lock { configuration } => lock::exec(manifest_path, configuration.as_deref()),
        Command::Files { configuration } => files::exec(manifest_path, configuration.as_deref()),
    }
}

/// Load the project from `--manifest-path`, or the nearest `Graft.toml` above the working directory.
fn load_project(manifest_path: Option<&Path>) -> Result<Project> {
    let manifest_path: PathBuf = match manifest_path {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().map_err(GraftError::Io)?;
            let root = graft_util::fs::find_ancestor_with(&cwd, "Graft.toml").ok_or_else(|| GraftError::Manifest {
                message: "No Graft.toml found in current directory or any parent".to_string(),
            })?;
            root.join("Graft.toml")
        }
    };
    tracing::debug!("using manifest {}", manifest_path.display());
    Project::load(&manifest_path)
}
