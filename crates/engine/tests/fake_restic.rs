//! Drives `ResticEngine` against a shell script that stands in for restic.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use restic_fleet_core::{BackupConfiguration, CredentialScope, Credentials, RepositoryDescriptor, Secret};
use restic_fleet_engine::{Engine, EngineError, ResticConfig, ResticEngine};

const FAKE_RESTIC: &str = r#"#!/bin/sh
dir=$(dirname "$0")
env > "$dir/env.txt"
echo "$@" >> "$dir/calls.txt"
for arg in "$@"; do
  case "$arg" in
    version) echo "restic 0.16.4 compiled with go1.21.6 on linux/amd64"; exit 0 ;;
    unlock) exit 0 ;;
    backup)
      echo '{"message_type":"status","percent_done":1}'
      echo '{"message_type":"summary","files_new":1,"files_changed":2,"data_added":1024,"total_duration":2.0,"snapshot_id":"ff"}'
      exit 0 ;;
    forget) echo "Fatal: unable to open repository" >&2; exit 1 ;;
    stats) echo '{"total_size":2048,"total_file_count":3,"snapshots_count":1}'; exit 0 ;;
    rewrite) exit 0 ;;
  esac
done
exit 2
"#;

#[tokio::test]
async fn drives_fake_restic_through_every_operation() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("restic");
    fs::write(&script, FAKE_RESTIC).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    let password_file = dir.path().join("password");
    fs::write(&password_file, "pw\n").unwrap();

    // A stale key in the parent must not reach the child.
    std::env::set_var("AWS_ACCESS_KEY_ID", "leaked-from-parent");

    let engine = ResticEngine::new(ResticConfig {
        binary: script,
        password_file,
    });

    let version = engine.version().await.unwrap();
    assert_eq!(version.engine_version, "0.16.4");

    let repo = RepositoryDescriptor {
        url: "b2:bucket:/host".to_owned(),
        credentials: Credentials::B2 {
            account_id: Secret::new("acct"),
            account_key: Secret::new("key"),
        },
    };
    let mut scope = CredentialScope::activate(&repo);

    engine.unlock(&scope).await.unwrap();
    let env = fs::read_to_string(dir.path().join("env.txt")).unwrap();
    assert!(env.lines().any(|l| l == "B2_ACCOUNT_ID=acct"));
    assert!(env.lines().any(|l| l == "B2_ACCOUNT_KEY=key"));
    assert!(!env.contains("AWS_ACCESS_KEY_ID="));

    let config = BackupConfiguration {
        paths: vec![PathBuf::from("/srv/data")],
        exclude_patterns: vec!["*.tmp".to_owned()],
        exclude_files: Vec::new(),
        keep_daily: 3,
    };
    let summary = engine.backup(&scope, &config).await.unwrap();
    assert_eq!(summary.data_added, 1024);
    assert_eq!(summary.files_changed, 2);

    let calls = fs::read_to_string(dir.path().join("calls.txt")).unwrap();
    let backup_call = calls.lines().find(|l| l.contains(" backup ")).unwrap();
    assert!(backup_call.starts_with("--repo b2:bucket:/host --password-file "));
    assert!(backup_call.ends_with("backup --json --exclude *.tmp /srv/data"));

    let stats = engine.stats(&scope).await.unwrap();
    assert_eq!(stats.total_file_count, 3);

    let err = engine.prune(&scope, 3).await.unwrap_err();
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::Failed { stderr, .. }) => {
            assert!(stderr.contains("unable to open repository"))
        }
        other => panic!("unexpected error: {other:?}"),
    }

    engine
        .rewrite(&scope, &[PathBuf::from("/etc/excludes")])
        .await
        .unwrap();
    let calls = fs::read_to_string(dir.path().join("calls.txt")).unwrap();
    assert!(calls.lines().last().unwrap().ends_with("rewrite --forget --exclude-file /etc/excludes"));

    scope.deactivate();
    let err = engine.unlock(&scope).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::InactiveScope { .. })
    ));

    std::env::remove_var("AWS_ACCESS_KEY_ID");
}
