//! Suites driven end to end against a shell script posing as the docker CLI.
#![cfg(unix)]

use pgpack_domain::config::HarnessConfig;
use pgpack_harness::suites::{autoconfig, extensions};
use pgpack_harness::{SuiteContext, Target};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::{TempDir, tempdir};

const FAKE_DOCKER: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
echo "$@" >> "$dir/calls.log"
cmd="$1"; shift
case "$cmd" in
  run) echo "cafebabecafebabecafebabe" ;;
  inspect) echo "true 0 running" ;;
  rm) exit 0 ;;
  logs) echo "INFO [AUTO-CONFIG] RAM: 1536MB (manual)"; echo "INFO [AUTO-CONFIG] CPU: 2 cores (nproc)" >&2 ;;
  exec)
    [ "$1" = "-i" ] && shift
    shift
    case "$1" in
      pg_isready) exit 0 ;;
      psql)
        sql=""
        while [ $# -gt 0 ]; do
          [ "$1" = "-c" ] && sql="$2"
          shift
        done
        case "$sql" in
          "CREATE EXTENSION"*vector*)
            if [ ! -f "$dir/vector.retried" ]; then
              touch "$dir/vector.retried"
              echo "FATAL:  the database system is starting up" >&2
              exit 2
            fi
            echo "CREATE EXTENSION" ;;
          "CREATE EXTENSION"*missing_ext*)
            echo 'ERROR:  extension "missing_ext" is not available' >&2
            exit 1 ;;
          "SELECT extversion"*) echo "0.8.0" ;;
          "SHOW shared_preload_libraries") echo "pg_safeupdate,pg_stat_statements" ;;
          "SHOW shared_buffers") echo "384MB" ;;
          "SHOW max_connections") echo "120" ;;
          *) echo "unexpected sql: $sql" >&2; exit 1 ;;
        esac ;;
    esac ;;
  *) exit 3 ;;
esac
"#;

const MANIFEST: &str = r#"{
  "entries": [
    { "name": "vector", "kind": "extension", "category": "ai",
      "source": { "type": "git", "repository": "https://github.com/pgvector/pgvector.git", "tag": "v0.8.0", "commit": "2627c5ff775ae6d7aef0c430121ccf857842d2f2" } },
    { "name": "missing_ext", "kind": "extension", "category": "test",
      "source": { "type": "builtin" } },
    { "name": "pg_safeupdate", "kind": "extension", "category": "safety",
      "source": { "type": "builtin" },
      "runtime": { "sharedPreload": true, "createExtension": false } },
    { "name": "pg_stat_statements", "kind": "builtin", "category": "observability",
      "source": { "type": "builtin" },
      "runtime": { "sharedPreload": true } }
  ]
}"#;

fn fake_docker() -> TempDir {
    let dir = tempdir().unwrap();
    let binary = dir.path().join("docker");
    fs::write(&binary, FAKE_DOCKER).unwrap();
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
    dir
}

fn context(dir: &Path, target: Target) -> SuiteContext {
    let mut config = HarnessConfig::default();
    config.docker.binary = dir.join("docker").to_string_lossy().into_owned();
    config.retry.base_delay_ms = 5;
    config.retry.max_delay_ms = 20;
    config.timeouts.poll_interval_ms = 10;
    config.timeouts.ready_secs = 5;
    SuiteContext::new(config, target)
}

fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log")).unwrap_or_default().lines().map(str::to_owned).collect()
}

#[tokio::test]
async fn extensions_suite_retries_transient_errors_and_reports_failures() {
    let dir = fake_docker();
    let manifest = dir.path().join("extensions.manifest.json");
    fs::write(&manifest, MANIFEST).unwrap();

    let ctx = context(dir.path(), Target::Image("pgpack:test".into()));
    let report = extensions::run(&ctx, &manifest).await.unwrap();

    let results: Vec<(&str, bool)> =
        report.outcomes().iter().map(|o| (o.name.as_str(), o.passed)).collect();
    assert_eq!(
        results,
        [
            ("missing_ext", false),
            ("vector", true),
            ("pg_safeupdate (preloaded)", true),
            ("pg_stat_statements (preloaded)", true),
        ]
    );
    assert!(!report.is_success());
    assert!(report.summary().contains("is not available"));

    let calls = calls(dir.path());
    let run = calls.iter().find(|c| c.starts_with("run ")).unwrap();
    assert!(run.contains("POSTGRES_SHARED_PRELOAD_LIBRARIES=pg_safeupdate,pg_stat_statements"));
    let vector_attempts = calls.iter().filter(|c| c.contains("CREATE EXTENSION") && c.contains("vector")).count();
    assert_eq!(vector_attempts, 2);
    assert!(calls.last().unwrap().starts_with("rm -f -v pgpack-test-extensions-"));
}

#[tokio::test]
async fn attached_containers_are_not_removed() {
    let dir = fake_docker();
    let manifest = dir.path().join("extensions.manifest.json");
    fs::write(&manifest, MANIFEST).unwrap();

    let ctx = context(dir.path(), Target::Container("shared-pg".into()));
    extensions::run(&ctx, &manifest).await.unwrap();

    let calls = calls(dir.path());
    assert!(calls.iter().all(|c| !c.starts_with("run ") && !c.starts_with("rm ")));
    assert!(calls.iter().any(|c| c.starts_with("exec shared-pg psql")));
}

#[tokio::test]
async fn single_autoconfig_scenario_passes() {
    let dir = fake_docker();
    let ctx = context(dir.path(), Target::Image("pgpack:test".into()));

    let report = autoconfig::run(&ctx, "pgpack:test", Some("manual-1536")).await.unwrap();
    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(report.outcomes().len(), 3);

    let calls = calls(dir.path());
    assert!(calls[0].contains("-e POSTGRES_MEMORY=1536"));
    assert_eq!(calls.iter().filter(|c| c.starts_with("rm -f -v")).count(), 1);
}
