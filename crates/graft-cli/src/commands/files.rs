//! Handler for `graft files`.

use miette::Result;
use std::path::Path;

pub fn exec(manifest_path: Option<&Path>, configuration: Option<&str>) -> Result<()> {
    let project = super::load_project(manifest_path)?;
    let resolution = project.resolve(configuration)?;
    for file in resolution.configuration.files()? {
        println!("{}", file.display());
    }
    Ok(())
}
