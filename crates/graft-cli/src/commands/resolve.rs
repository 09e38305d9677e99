//! Handler for `graft resolve`.

use graft_core::config::ConflictStrategy;
use graft_resolver::resolver::Resolution;
use miette::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Report {
    configuration: String,
    dependencies: Vec<DependencyEntry>,
    conflicts: Vec<ConflictEntry>,
    unresolved: Vec<UnresolvedEntry>,
}

#[derive(Serialize)]
struct DependencyEntry {
    module: String,
    version: String,
    configuration: String,
    reason: String,
}

#[derive(Serialize)]
struct ConflictEntry {
    module: String,
    requested: Vec<String>,
    resolved: String,
    reason: String,
}

#[derive(Serialize)]
struct UnresolvedEntry {
    requested: String,
    error: String,
    paths: Vec<Vec<String>>,
}

impl Report {
    fn from_resolution(resolution: &Resolution) -> Self {
        let configuration = &resolution.configuration;
        Self {
            configuration: configuration.configuration().to_string(),
            dependencies: configuration
                .all_dependencies()
                .map(|d| DependencyEntry {
                    module: d.module_version().module.to_string(),
                    version: d.module_version().version.clone(),
                    configuration: d.configuration().to_string(),
                    reason: d.reason.to_string(),
                })
                .collect(),
            conflicts: resolution
                .conflicts
                .conflicts
                .iter()
                .map(|c| ConflictEntry {
                    module: c.module.to_string(),
                    requested: c.requested.iter().map(|v| v.version.clone()).collect(),
                    resolved: c.resolved.version.clone(),
                    reason: c.reason.to_string(),
                })
                .collect(),
            unresolved: configuration
                .unresolved()
                .iter()
                .map(|u| UnresolvedEntry {
                    requested: u.selector.to_string(),
                    error: u.failure.to_string(),
                    paths: u
                        .paths
                        .iter()
                        .map(|path| path.iter().map(|p| p.to_string()).collect())
                        .collect(),
                })
                .collect(),
        }
    }
}

pub fn exec(manifest_path: Option<&Path>, configuration: Option<&str>, strict: bool, json: bool) -> Result<()> {
    let mut project = super::load_project(manifest_path)?;
    if strict {
        project.config.conflict_strategy = ConflictStrategy::Fail;
    }
    let resolution = project.resolve(configuration)?;

    if json {
        let report = Report::from_resolution(&resolution);
        let rendered = serde_json::to_string_pretty(&report).map_err(|e| graft_util::errors::GraftError::Generic {
            message: format!("Failed to render JSON: {e}"),
        })?;
        println!("{rendered}");
    } else {
        let config = &resolution.configuration;
        println!(
            "Resolved {} dependencies for configuration '{}'",
            config.all_dependencies().count(),
            config.configuration()
        );
        for dependency in config.all_dependencies() {
            match dependency.reason {
                graft_resolver::resolvers::SelectionReason::Requested => println!("  {dependency}"),
                reason => println!("  {dependency} ({reason})"),
            }
        }
        for unresolved in config.unresolved() {
            tracing::warn!("unresolved dependency {}", unresolved.selector);
        }
    }

    resolution.configuration.rethrow_failure()?;
    Ok(())
}
