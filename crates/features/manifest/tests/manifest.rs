use pgpack_manifest::{ManifestError, ManifestExt, from_json, load};
use std::fs;
use tempfile::tempdir;

const COMMIT: &str = "2627c5ff775ae6d7aef0c430121ccf857842d2f2";

fn entry(name: &str, deps: &[&str]) -> String {
    format!(
        r#"{{
            "name": "{name}",
            "kind": "extension",
            "category": "test",
            "dependencies": {deps:?},
            "source": {{ "type": "git", "repository": "https://example.com/{name}.git", "tag": "v1", "commit": "{COMMIT}" }}
        }}"#
    )
}

fn manifest_json(entries: &[String]) -> String {
    format!(r#"{{ "entries": [{}] }}"#, entries.join(","))
}

fn names<'a>(entries: impl IntoIterator<Item = &'a pgpack_manifest::ExtensionEntry>) -> Vec<&'a str> {
    entries.into_iter().map(|e| e.name.as_str()).collect()
}

const IMAGE_MANIFEST: &str = r#"{
  "entries": [
    {
      "name": "timescaledb_toolkit",
      "kind": "extension",
      "category": "timeseries",
      "dependencies": ["timescaledb"],
      "source": { "type": "git", "repository": "https://github.com/timescale/timescaledb-toolkit.git", "tag": "1.21.0", "commit": "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678" }
    },
    {
      "name": "timescaledb",
      "kind": "extension",
      "category": "timeseries",
      "source": { "type": "git", "repository": "https://github.com/timescale/timescaledb.git", "tag": "2.17.2", "commit": "0123456789abcdef0123456789abcdef01234567" },
      "runtime": { "sharedPreload": true }
    },
    {
      "name": "pg_stat_statements",
      "kind": "builtin",
      "category": "observability",
      "source": { "type": "builtin" },
      "runtime": { "sharedPreload": true }
    },
    {
      "name": "auto_explain",
      "kind": "builtin",
      "category": "observability",
      "source": { "type": "builtin" },
      "runtime": { "sharedPreload": true, "createExtension": false }
    },
    {
      "name": "pg_safeupdate",
      "kind": "extension",
      "category": "safety",
      "source": { "type": "git-ref", "repository": "https://github.com/eradman/pg-safeupdate.git", "ref": "master", "commit": "fedcba9876543210fedcba9876543210fedcba98" },
      "runtime": { "sharedPreload": true, "createExtension": false }
    },
    {
      "name": "vector",
      "kind": "extension",
      "category": "ai",
      "source": { "type": "git", "repository": "https://github.com/pgvector/pgvector.git", "tag": "v0.8.0", "commit": "2627c5ff775ae6d7aef0c430121ccf857842d2f2" }
    },
    {
      "name": "vectorscale",
      "kind": "extension",
      "category": "ai",
      "dependencies": ["vector"],
      "source": { "type": "git", "repository": "https://github.com/timescale/pgvectorscale.git", "tag": "0.5.1", "commit": "ffffffffffffffffffffffffffffffffffffffff" },
      "enabled": false,
      "disabledReason": "requires a newer rust toolchain"
    }
  ]
}"#;

#[test]
fn load_reads_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("extensions.manifest.json");
    fs::write(&path, IMAGE_MANIFEST).unwrap();

    let manifest = load(&path).unwrap();
    assert_eq!(manifest.entries.len(), 7);
    manifest.validate().unwrap();
}

#[test]
fn load_reports_missing_file_with_context() {
    let err = load("/nonexistent/extensions.manifest.json").unwrap_err();
    assert!(matches!(err, ManifestError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/extensions.manifest.json"));
}

#[test]
fn malformed_json_is_rejected() {
    assert!(matches!(from_json("{ \"entries\": [ { \"name\": 1 } ] }"), Err(ManifestError::Json { .. })));
}

#[test]
fn enabled_filters_disabled_entries() {
    let manifest = from_json(IMAGE_MANIFEST).unwrap();
    let enabled = names(manifest.enabled());
    assert_eq!(enabled.len(), 6);
    assert!(!enabled.contains(&"vectorscale"));
}

#[test]
fn order_puts_dependencies_first_and_is_alphabetical_otherwise() {
    let manifest = from_json(IMAGE_MANIFEST).unwrap();
    let order = names(manifest.resolve_order().unwrap());
    assert_eq!(
        order,
        [
            "auto_explain",
            "pg_safeupdate",
            "pg_stat_statements",
            "timescaledb",
            "timescaledb_toolkit",
            "vector",
        ]
    );
}

#[test]
fn order_is_deterministic_regardless_of_input_order() {
    let forward = from_json(&manifest_json(&[entry("c", &["a"]), entry("b", &[]), entry("a", &[])])).unwrap();
    let reverse = from_json(&manifest_json(&[entry("a", &[]), entry("b", &[]), entry("c", &["a"])])).unwrap();
    assert_eq!(names(forward.resolve_order().unwrap()), ["a", "b", "c"]);
    assert_eq!(names(reverse.resolve_order().unwrap()), ["a", "b", "c"]);
}

#[test]
fn diamond_dependencies_resolve() {
    let manifest = from_json(&manifest_json(&[
        entry("top", &["left", "right"]),
        entry("left", &["base"]),
        entry("right", &["base"]),
        entry("base", &[]),
    ]))
    .unwrap();
    assert_eq!(names(manifest.resolve_order().unwrap()), ["base", "left", "right", "top"]);
}

#[test]
fn preload_and_creatable_follow_resolved_order() {
    let manifest = from_json(IMAGE_MANIFEST).unwrap();
    assert_eq!(
        manifest.preload_libraries().unwrap(),
        ["auto_explain", "pg_safeupdate", "pg_stat_statements", "timescaledb"]
    );
    assert_eq!(
        names(manifest.creatable().unwrap()),
        ["timescaledb", "timescaledb_toolkit", "vector"]
    );
}

#[test]
fn unknown_dependency_names_both_entries() {
    let manifest = from_json(&manifest_json(&[entry("postgis_topology", &["postgis"])])).unwrap();
    let err = manifest.resolve_order().unwrap_err();
    assert!(matches!(
        err,
        ManifestError::UnknownDependency { ref entry, ref dependency, .. }
            if entry == "postgis_topology" && dependency == "postgis"
    ));
}

#[test]
fn dependency_on_disabled_entry_is_an_error() {
    let raw = IMAGE_MANIFEST.replace(
        r#""category": "timeseries",
      "source": { "type": "git", "repository": "https://github.com/timescale/timescaledb.git""#,
        r#""category": "timeseries",
      "enabled": false,
      "source": { "type": "git", "repository": "https://github.com/timescale/timescaledb.git""#,
    );
    let manifest = from_json(&raw).unwrap();
    let err = manifest.resolve_order().unwrap_err();
    assert!(matches!(err, ManifestError::DisabledDependency { ref dependency, .. } if dependency == "timescaledb"));
}

#[test]
fn cycles_name_the_involved_entries() {
    let manifest = from_json(&manifest_json(&[
        entry("a", &["c"]),
        entry("b", &["a"]),
        entry("c", &["b"]),
        entry("free", &[]),
    ]))
    .unwrap();
    let err = manifest.resolve_order().unwrap_err();
    assert!(matches!(err, ManifestError::Cycle { ref entries, .. } if entries == &["a", "b", "c"]));
    assert_eq!(err.to_string(), "Circular dependency between: a, b, c");
}

#[test]
fn duplicate_names_are_rejected_before_ordering() {
    let raw = r#"{
      "entries": [
        { "name": "vector", "kind": "extension", "category": "ai", "source": { "type": "builtin" } },
        { "name": "vector", "kind": "extension", "category": "ai", "enabled": false,
          "source": { "type": "builtin" } }
      ]
    }"#;
    let manifest = from_json(raw).unwrap();
    assert_eq!(manifest.enabled().len(), 1);

    let err = manifest.resolve_order().unwrap_err();
    assert!(matches!(err, ManifestError::Duplicate { ref name, .. } if name == "vector"));
    assert_eq!(err.to_string(), "Extension 'vector' is declared more than once");
    assert!(manifest.preload_libraries().is_err());
    assert!(manifest.creatable().is_err());
}

#[test]
fn validation_aggregates_every_problem() {
    let raw = manifest_json(&[
        entry("Bad-Name", &[]),
        entry("dup", &[]),
        entry("dup", &[]),
        entry("selfish", &["selfish"]),
        r#"{ "name": "short", "kind": "extension", "category": "x",
             "source": { "type": "git", "repository": " ", "tag": "v1", "commit": "abc123" } }"#
            .to_owned(),
    ]);
    let err = from_json(&raw).unwrap().validate().unwrap_err();

    let ManifestError::Invalid { problems, .. } = &err else {
        panic!("expected Invalid, got {err:?}");
    };
    assert_eq!(problems.len(), 5, "{problems:#?}");
    let text = err.to_string();
    assert!(text.contains("'Bad-Name': name must match [a-z0-9_]+"));
    assert!(text.contains("'dup': duplicate name"));
    assert!(text.contains("'selfish': depends on itself"));
    assert!(text.contains("'short': git source without repository"));
    assert!(text.contains("'short': commit 'abc123' is not a 40-character hex hash"));
}
