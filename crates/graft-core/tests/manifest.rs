use graft_core::config::ConflictStrategy;
use graft_core::manifest::Manifest;
use tempfile::TempDir;

const MANIFEST: &str = r#"
[project]
group = "com.example"
name = "app"
version = "1.0.0"

[repository]
path = "repo/repository.toml"

[resolution]
conflict-strategy = "fail"
replacements = { "org.old:old" = "org.new:new" }

[dependencies]
a = "org.a:a:1.0"
b = { group = "org.b", version = "1.0", force = true, exclusions = [{ group = "org.z" }] }

[dev-dependencies]
junit = { group = "junit", version = "4.13", transitive = false }

[configurations.runtime]
extends = ["compile"]
exclusions = [{ group = "org.c", module = "c" }]

[configurations.runtime.dependencies]
d = "org.d:d:2.0"
"#;

#[test]
fn test_parse_full_manifest() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    assert_eq!(manifest.project.group, "com.example");
    assert_eq!(manifest.project.name, "app");
    assert_eq!(manifest.dependencies.len(), 2);
    assert_eq!(manifest.dev_dependencies.len(), 1);
    assert_eq!(manifest.configurations.len(), 1);
    let resolution = manifest.resolution.as_ref().unwrap();
    assert_eq!(resolution.conflict_strategy, Some(ConflictStrategy::Fail));
    assert_eq!(resolution.replacements.len(), 1);
}

#[test]
fn test_root_metadata_configurations() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    let root = manifest.root_metadata().unwrap();
    let names: Vec<&str> = root.configuration_names().collect();
    assert_eq!(names, vec!["compile", "test", "runtime"]);

    let compile = root.configuration("compile").unwrap();
    assert_eq!(compile.dependencies.len(), 2);
    let b = compile
        .dependencies
        .iter()
        .find(|d| d.requested.module.name == "b")
        .unwrap();
    assert!(b.force);
    assert_eq!(b.excludes.len(), 1);
    assert_eq!(b.excludes[0].group, "org.z");
    assert_eq!(b.excludes[0].module, "*");

    let test = root.configuration("test").unwrap();
    assert_eq!(test.hierarchy, vec!["test", "compile"]);
    assert_eq!(test.dependencies.len(), 3);
    assert!(!test.dependencies[0].transitive);

    let runtime = root.configuration("runtime").unwrap();
    assert_eq!(runtime.dependencies.len(), 3);
    assert_eq!(runtime.excludes.len(), 1);
}

#[test]
fn test_short_dependency_must_have_three_parts() {
    let manifest = Manifest::from_str(
        r#"
[project]
group = "g"
name = "n"

[dependencies]
bad = "org.a:a"
"#,
    )
    .unwrap();
    let err = manifest.root_metadata().unwrap_err();
    assert!(err.to_string().contains("bad"), "got: {err}");
}

#[test]
fn test_configuration_cycle_rejected() {
    let manifest = Manifest::from_str(
        r#"
[project]
group = "g"
name = "n"

[configurations.a]
extends = ["b"]

[configurations.b]
extends = ["a"]
"#,
    )
    .unwrap();
    let err = manifest.root_metadata().unwrap_err();
    assert!(err.to_string().contains("cycle"), "got: {err}");
}

#[test]
fn test_missing_project_section_is_error() {
    let err = Manifest::from_str("[dependencies]\n").unwrap_err();
    assert!(err.to_string().contains("Graft.toml"), "got: {err}");
}

#[test]
fn test_from_path_and_repository_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Graft.toml");
    std::fs::write(&path, MANIFEST).unwrap();
    let manifest = Manifest::from_path(&path).unwrap();
    assert_eq!(
        manifest.repository_path(tmp.path()).unwrap(),
        tmp.path().join("repo/repository.toml")
    );
}

#[test]
fn test_version_defaults_to_unspecified() {
    let manifest = Manifest::from_str("[project]\ngroup = \"g\"\nname = \"n\"\n").unwrap();
    assert_eq!(manifest.module_version().to_string(), "g:n:unspecified");
}

#[test]
fn test_missing_manifest_names_the_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Graft.toml");
    let err = Manifest::from_path(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Failed to read"), "got: {message}");
    assert!(message.contains(&path.display().to_string()), "got: {message}");
}
