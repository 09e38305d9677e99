mod support;

use graft_core::config::ResolutionConfig;
use graft_core::metadata::{ArtifactPattern, Exclude, IvyArtifactName};
use graft_resolver::repository::FileRepository;
use graft_resolver::resolver::resolve;
use std::path::Path;
use std::sync::Arc;
use support::{dep, root};

const REPOSITORY: &str = r#"
[[component]]
group = "org.a"
name = "a"
version = "1.0"
[component.dependencies]
c = "org.c:c:1.0"

[[component]]
group = "org.c"
name = "c"
version = "1.0"
[component.configurations.default]
artifacts = [{}, { classifier = "sources", type = "source" }]
"#;

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
}

fn repository(files: &[&str]) -> (tempfile::TempDir, Arc<FileRepository>) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("repository.toml"), REPOSITORY).unwrap();
    for file in files {
        touch(dir.path(), file);
    }
    let repo = FileRepository::open(&dir.path().join("repository.toml")).unwrap();
    (dir, Arc::new(repo))
}

fn names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn files_resolve_from_the_repository_layout() {
    let (_dir, repo) = repository(&[
        "org.a/a/1.0/a-1.0.jar",
        "org.c/c/1.0/c-1.0.jar",
        "org.c/c/1.0/c-1.0-sources.jar",
    ]);
    let resolution = resolve(&root(vec![dep("org.a:a:1.0")]), &ResolutionConfig::default(), repo).unwrap();
    let files = resolution.configuration.files().unwrap();
    assert_eq!(names(&files), vec!["a-1.0.jar", "c-1.0.jar", "c-1.0-sources.jar"]);
    assert!(files.iter().all(|f| f.is_file()));
}

#[test]
fn artifact_exclusions_keep_the_module() {
    let (_dir, repo) = repository(&["org.a/a/1.0/a-1.0.jar", "org.c/c/1.0/c-1.0.jar"]);
    let sources = Exclude::artifact(
        "org.c",
        "c",
        ArtifactPattern {
            name: "*".into(),
            kind: "source".into(),
            extension: "*".into(),
        },
    );
    let resolution = resolve(
        &root(vec![dep("org.a:a:1.0").excluding(sources)]),
        &ResolutionConfig::default(),
        repo,
    )
    .unwrap();
    let config = &resolution.configuration;
    assert!(config.find("org.c", "c").is_some());
    assert_eq!(names(&config.files().unwrap()), vec!["a-1.0.jar", "c-1.0.jar"]);
}

#[test]
fn requested_artifacts_replace_the_defaults() {
    let (_dir, repo) = repository(&["org.c/c/1.0/c-1.0-sources.jar"]);
    let request = dep("org.c:c:1.0").with_artifact(IvyArtifactName::new("c", "source", "jar").with_classifier("sources"));
    let resolution = resolve(&root(vec![request]), &ResolutionConfig::default(), repo).unwrap();
    let config = &resolution.configuration;
    let c = config.find("org.c", "c").unwrap();
    let artifacts: Vec<String> = config
        .parent_artifacts(c, config.root())
        .unwrap()
        .iter()
        .map(|a| a.name().to_string())
        .collect();
    assert_eq!(artifacts, vec!["c-sources.jar"]);
    assert_eq!(names(&config.files().unwrap()), vec!["c-1.0-sources.jar"]);
}

#[test]
fn missing_files_fail_only_when_asked_for() {
    let (_dir, repo) = repository(&["org.a/a/1.0/a-1.0.jar"]);
    let resolution = resolve(&root(vec![dep("org.a:a:1.0")]), &ResolutionConfig::default(), repo).unwrap();
    let config = &resolution.configuration;
    assert!(!config.has_error());
    assert_eq!(config.artifacts().unwrap().len(), 3);
    let err = config.files().unwrap_err();
    assert!(err.to_string().contains("c.jar (org.c:c:1.0)"), "{err}");
}

#[test]
fn lockfile_pins_resolved_versions() {
    let (_dir, repo) = repository(&[]);
    let resolution = resolve(&root(vec![dep("org.a:a:1.0")]), &ResolutionConfig::default(), repo).unwrap();
    let lockfile = resolution.configuration.to_lockfile();
    assert_eq!(lockfile.configuration, "compile");
    let a = lockfile.find("org.a", "a").unwrap();
    assert_eq!(a.version, "1.0");
    assert_eq!(a.dependencies.len(), 1);
    assert_eq!(a.dependencies[0].name, "c");
    assert_eq!(lockfile.find("org.c", "c").unwrap().reason.as_deref(), Some("requested"));
}
