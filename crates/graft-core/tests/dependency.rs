use graft_core::dependency::{Coordinate, Dependency, Exclusion};
use graft_core::metadata::PatternMatcher;
use std::collections::BTreeMap;

#[test]
fn test_coordinate_parse() {
    let c = Coordinate::parse("org.a:a:1.0").unwrap();
    assert_eq!(c.group, "org.a");
    assert_eq!(c.to_string(), "org.a:a:1.0");
    assert!(Coordinate::parse("org.a:a").is_none());
    assert!(Coordinate::parse("org.a::1.0").is_none());
}

#[test]
fn test_detailed_name_defaults_to_key() {
    let deps: BTreeMap<String, Dependency> = toml::from_str(
        r#"
guava = { group = "com.google", version = "1.+", configuration = "runtime" }
"#,
    )
    .unwrap();
    let meta = deps["guava"].to_metadata("guava").unwrap();
    assert_eq!(meta.requested.to_string(), "com.google:guava:1.+");
    assert_eq!(meta.target_configurations, vec!["runtime"]);
    assert!(meta.transitive);
}

#[test]
fn test_artifact_request_defaults() {
    let deps: BTreeMap<String, Dependency> = toml::from_str(
        r#"
a = { group = "org.a", version = "1.0", artifacts = [{ classifier = "sources" }] }
"#,
    )
    .unwrap();
    let meta = deps["a"].to_metadata("a").unwrap();
    assert_eq!(meta.artifacts.len(), 1);
    assert_eq!(meta.artifacts[0].to_string(), "a-sources.jar");
}

#[test]
fn test_exclusion_wildcards() {
    let exclusion: Exclusion = toml::from_str("group = \"org.z\"\nmatcher = \"glob\"\n").unwrap();
    let exclude = exclusion.to_exclude();
    assert_eq!(exclude.group, "org.z");
    assert_eq!(exclude.module, "*");
    assert!(exclude.is_module_wide());
    assert_eq!(exclude.matcher, PatternMatcher::Glob);

    let artifact_only: Exclusion = toml::from_str("module = \"c\"\nclassifier = \"x\"\nextension = \"zip\"\n").unwrap();
    assert!(!artifact_only.to_exclude().is_module_wide());
}
