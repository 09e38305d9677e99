//! Handler for `graft tree`.

use miette::Result;
use std::path::Path;

pub fn exec(
    manifest_path: Option<&Path>,
    configuration: Option<&str>,
    depth: Option<u32>,
    inverted: bool,
    why: Option<&str>,
    conflicts: bool,
) -> Result<()> {
    let project = super::load_project(manifest_path)?;
    let resolution = project.resolve(configuration)?;
    let result = &resolution.result;

    // Handle --conflicts
    if conflicts {
        if resolution.conflicts.is_empty() {
            println!("{}", resolution.conflicts);
        } else {
            print!("{}", resolution.conflicts);
        }
        return Ok(());
    }

    // Handle --why, optionally inverted
    if let Some(target) = why {
        if result.find(target).is_none() {
            println!("Dependency '{target}' not found in the graph.");
            return Ok(());
        }
        if inverted {
            print!("{}", result.print_inverted_tree(target));
        } else if let Some(path) = result.find_path(target) {
            println!("Path to {target}:");
            for (i, node) in path.iter().enumerate() {
                let indent = "  ".repeat(i);
                println!("{indent}{node}");
            }
        }
        return Ok(());
    }

    print!("{}", result.print_tree(depth.map(|d| d as usize)));
    if !result.unresolved().is_empty() {
        tracing::warn!("{} dependencies could not be resolved", result.unresolved().len());
    }
    Ok(())
}
