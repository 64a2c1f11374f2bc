/// Integration tests of the `rollcall` binary
use assert_cmd::Command;
use predicates::prelude::*;
use rollcall::leadership::member::now_millis;
use rollcall::leadership::{ElectionSettings, LeaderElection, Member};
use rollcall::storage::{SqliteAdapter, StorageAdapter, StorageError};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn write_config(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_status_with_memory_storage() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "rollcall.toml", "[storage]\ntype = \"memory\"\n");

    Command::cargo_bin("rollcall")
        .unwrap()
        .args(["--config", &config, "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"healthy\": true"))
        .stdout(predicate::str::contains("\"election_enabled\": false"));
}

#[test]
fn test_members_with_memory_storage() {
    Command::cargo_bin("rollcall")
        .unwrap()
        .env_remove("ROLLCALL_STORAGE_TYPE")
        .arg("members")
        .assert()
        .success()
        .stdout(predicate::str::contains("Memory storage"));
}

fn sqlite_config(dir: &Path, db: &Path) -> String {
    write_config(
        dir,
        "rollcall.yaml",
        &format!(
            "storage:\n  type: sql\n  provider: sqlite\n  config:\n    path: \"{}\"\n",
            db.display()
        ),
    )
}

/// Tests the status report against a shared SQLite file.
///
/// # Purpose
/// `status` names the member the candidates agree on, not an identity of
/// its own.
///
/// # Steps
/// 1. Create the table and store two fresh members, `alpha` the senior.
/// 2. Run `status` against the same file.
/// 3. Verify the leader id and member count in the JSON.
#[test]
fn test_status_names_the_elected_member() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("members.db");
    let config = sqlite_config(dir.path(), &db);

    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let storage = Arc::new(SqliteAdapter::open(&db).unwrap());
        LeaderElection::new(storage.clone(), ElectionSettings::default())
            .prepare_table()
            .await
            .unwrap();
        let now = now_millis();
        storage
            .create_or_replace(&Member::new("alpha", now - 1_000).with_heartbeat(now))
            .await
            .unwrap();
        storage
            .create_or_replace(&Member::new("beta", now - 500).with_heartbeat(now))
            .await
            .unwrap();
    });

    Command::cargo_bin("rollcall")
        .unwrap()
        .args(["--config", &config, "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"leader_id\": \"alpha\""))
        .stdout(predicate::str::contains("\"members\": 2"))
        .stdout(predicate::str::contains("\"node\"").not());
}

#[test]
fn test_members_with_empty_sqlite_table() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("members.db");
    let config = sqlite_config(dir.path(), &db);

    Command::cargo_bin("rollcall")
        .unwrap()
        .args(["--config", &config, "members"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No members registered"));

    // Listing never creates the table.
    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let storage = SqliteAdapter::open(&db).unwrap();
        assert!(matches!(storage.list().await, Err(StorageError::NotFound(_))));
    });
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "rollcall.toml", "[storage]\ntype = \"sql\"\n");

    Command::cargo_bin("rollcall")
        .unwrap()
        .args(["--config", &config, "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SQL storage requires a provider"));
}

#[test]
fn test_unbundled_provider_is_reported() {
    Command::cargo_bin("rollcall")
        .unwrap()
        .env("ROLLCALL_STORAGE_TYPE", "sql")
        .env("ROLLCALL_STORAGE_PROVIDER", "postgresql")
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no postgresql driver is bundled"));
}
