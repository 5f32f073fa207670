//! CLI end-to-end tests that invoke the compiled `rolesync` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use rolesync_core::{GroupId, MemoryDirectory, RoleId, SyncRegistry, UserId};
use rolesync_test_utils::fleet::{self, *};
use tempfile::TempDir;

/// A config file, a registry path and a fleet snapshot in a temp dir
struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = format!(
            "[groups]\nprimary = {PRIMARY}\nsecondary = {SECONDARY}\n\n[registry]\npath = \"sync_roles.json\"\n\n[sync]\nreconcile_on_startup = false\n"
        );
        std::fs::write(temp.path().join("rolesync.toml"), config).unwrap();
        rolesync_fs::ConfigStore::new()
            .save(&temp.path().join("directory.json"), &fleet::snapshot())
            .unwrap();
        Self { temp }
    }

    fn path(&self) -> &Path {
        self.temp.path()
    }

    fn snapshot(&self) -> PathBuf {
        self.path().join("directory.json")
    }

    fn registry(&self) -> SyncRegistry {
        SyncRegistry::load(self.path().join("sync_roles.json"))
    }

    fn rolesync(&self) -> Command {
        let mut cmd = Command::cargo_bin("rolesync").unwrap();
        cmd.current_dir(self.path()).env_remove("RUST_LOG");
        cmd
    }

    fn roles_of(&self, group: u64, user: UserId) -> Vec<RoleId> {
        let snapshot = MemoryDirectory::load(&self.snapshot())
            .unwrap()
            .snapshot()
            .unwrap();
        snapshot
            .group(GroupId(group))
            .and_then(|g| g.member(user))
            .map(|m| m.roles.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[test]
fn test_help_exits_zero() {
    Command::cargo_bin("rolesync")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reconcile"));
}

#[test]
fn test_missing_config_fails() {
    let temp = TempDir::new().unwrap();
    Command::cargo_bin("rolesync")
        .unwrap()
        .current_dir(temp.path())
        .args(["roles", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rolesync.toml"));
}

#[test]
fn test_roles_add_list_remove() {
    let ws = Workspace::new();

    ws.rolesync()
        .args(["roles", "add", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pilot"));
    assert!(ws.registry().contains(PILOT));

    ws.rolesync()
        .args(["roles", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10"));

    ws.rolesync().args(["roles", "remove", "10"]).assert().success();
    assert!(ws.registry().is_empty());

    ws.rolesync()
        .args(["roles", "remove", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the sync list"));
}

#[test]
fn test_roles_add_rejects_unknown_role() {
    let ws = Workspace::new();

    ws.rolesync()
        .args(["roles", "add", "22"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    assert!(!ws.path().join("sync_roles.json").exists());
}

#[test]
fn test_reconcile_dry_run_json_leaves_snapshot_unchanged() {
    let ws = Workspace::new();
    ws.rolesync().args(["roles", "add", "10"]).assert().success();
    let before = std::fs::read_to_string(ws.snapshot()).unwrap();

    let output = ws
        .rolesync()
        .args(["reconcile", "--dry-run", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["changes"].as_array().unwrap().len(), 2);
    assert_eq!(std::fs::read_to_string(ws.snapshot()).unwrap(), before);
}

#[test]
fn test_reconcile_applies_and_saves() {
    let ws = Workspace::new();
    ws.rolesync().args(["roles", "add", "10"]).assert().success();

    ws.rolesync()
        .arg("reconcile")
        .assert()
        .success()
        .stdout(predicate::str::contains("added 1, removed 1"));

    assert_eq!(ws.roles_of(SECONDARY, ANA), vec![SENIOR_PILOT]);
    assert_eq!(ws.roles_of(SECONDARY, BO), vec![SECONDARY_ENGINEER]);
}

#[test]
fn test_run_reads_requests_from_stdin() {
    let ws = Workspace::new();
    ws.rolesync().args(["roles", "add", "11"]).assert().success();
    let input = format!(
        "{{\"type\":\"set_roles\",\"group\":{PRIMARY},\"user\":103,\"roles\":[11]}}\n\
         {{\"type\":\"command\",\"caller\":1,\"is_admin\":true,\"name\":\"removesyncrole\",\"args\":[\"11\"]}}\n"
    );

    ws.rolesync()
        .arg("run")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("removed from the sync list"));

    assert_eq!(ws.roles_of(SECONDARY, DI), vec![JUNIOR_OFFICER, SECONDARY_ENGINEER]);
    assert!(ws.registry().is_empty());
}
