//! Handler for `graft lock`.

use graft_util::errors::GraftError;
use miette::Result;
use std::path::Path;

pub fn exec(manifest_path: Option<&Path>, configuration: Option<&str>) -> Result<()> {
    let project = super::load_project(manifest_path)?;
    let resolution = project.resolve(configuration)?;
    resolution.configuration.rethrow_failure()?;

    let lockfile = resolution.configuration.to_lockfile();
    let content = lockfile.to_string_pretty().map_err(|e| GraftError::Generic {
        message: format!("Failed to serialize lockfile: {e}"),
    })?;
    let path = project.lockfile_path();
    graft_util::fs::write_file(&path, &content)?;
    println!(
        "Wrote {} ({} modules, configuration '{}')",
        path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        lockfile.module.len(),
        lockfile.configuration
    );
    Ok(())
}
