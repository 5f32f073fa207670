//! End-to-end flow across the workspace crates
//!
//! config file -> registry on disk -> worker -> commands and member updates
//! -> secondary group -> restart.

use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use rolesync_core::{
    Coordinator, GroupId, Invocation, MemberUpdate, MemoryDirectory, Settings, SyncOptions,
    SyncRegistry, UserId, WorkQueue, WorkerStats, work_queue,
};
use rolesync_test_utils::fleet::{self, *};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const ADMIN: UserId = UserId(1);

fn write_config(root: &Path) -> Settings {
    let path = root.join("rolesync.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[groups]
primary = {PRIMARY}
secondary = {SECONDARY}
commands = {COMMANDS}

[registry]
path = "state/sync_roles.json"

[sync]
auto_sync = true
queue_capacity = 4
"#
        ),
    )
    .unwrap();
    Settings::load(&path).unwrap()
}

fn start(settings: &Settings, directory: &Arc<MemoryDirectory>) -> (WorkQueue, JoinHandle<WorkerStats>) {
    let registry = SyncRegistry::load(&settings.registry.path);
    let coordinator = Arc::new(Coordinator::new(directory.clone(), registry, settings));
    let (queue, worker) = work_queue(coordinator, settings.sync.queue_capacity);
    (queue, worker.spawn())
}

fn admin(name: &str, args: &[&str]) -> Invocation {
    let mut invocation = Invocation::new(ADMIN, true, name, args);
    invocation.origin = Some(GroupId(COMMANDS));
    invocation
}

async fn forward(updates: &mut broadcast::Receiver<MemberUpdate>, queue: &WorkQueue) {
    while let Ok(update) = updates.try_recv() {
        queue.submit_update(update).await.unwrap();
    }
}

fn roles_of(directory: &MemoryDirectory, group: u64, user: UserId) -> Vec<rolesync_core::RoleId> {
    directory
        .snapshot()
        .unwrap()
        .group(GroupId(group))
        .and_then(|g| g.member(user))
        .map(|m| m.roles.iter().copied().collect())
        .unwrap_or_default()
}

#[test]
fn test_config_paths_resolve_against_config_dir() {
    let temp = TempDir::new().unwrap();
    let settings = write_config(temp.path());

    assert_eq!(
        settings.registry.path,
        temp.path().join("state").join("sync_roles.json")
    );
    assert_eq!(settings.groups.commands, Some(GroupId(COMMANDS)));
    assert_eq!(settings.sync.queue_capacity, 4);
}

#[tokio::test]
async fn test_full_service_lifecycle() {
    let temp = TempDir::new().unwrap();
    let settings = write_config(temp.path());
    let directory = Arc::new(MemoryDirectory::new(fleet::snapshot()));
    let mut updates = directory.subscribe();

    // first run: register roles over the command surface, then sweep
    let (queue, worker) = start(&settings, &directory);
    for role in ["10", "11", "12"] {
        let response = queue.command(admin("addsyncrole", &[role])).await.unwrap();
        assert!(response.success, "{}", response.text);
    }
    let report = queue.reconcile(SyncOptions::default()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(roles_of(&directory, SECONDARY, ANA), vec![JUNIOR_OFFICER, SENIOR_PILOT]);

    // a primary-side grant reaches the secondary through the queue
    let response = queue.command(admin("give", &["103", "12"])).await.unwrap();
    assert!(response.success, "{}", response.text);
    forward(&mut updates, &queue).await;

    // with auto-sync off the next grant stays primary-only
    queue.command(admin("sync", &["off"])).await.unwrap();
    queue.command(admin("give", &["101", "10"])).await.unwrap();
    forward(&mut updates, &queue).await;

    drop(queue);
    let stats = worker.await.unwrap();
    assert!(stats.suppressed >= 1);
    assert_eq!(roles_of(&directory, SECONDARY, DI), vec![JUNIOR_OFFICER]);
    assert_eq!(roles_of(&directory, PRIMARY, BO), vec![PILOT, ENGINEER]);
    assert_eq!(roles_of(&directory, SECONDARY, BO), vec![SECONDARY_ENGINEER]);

    // restart: the registry survives and the startup sweep catches up
    let (queue, worker) = start(&settings, &directory);
    let report = queue.reconcile(SyncOptions::default()).await.unwrap();
    drop(queue);
    worker.await.unwrap();

    assert_eq!(report.additions(), 1);
    assert_eq!(
        SyncRegistry::load(&settings.registry.path).role_ids(),
        vec![PILOT, ENGINEER, OFFICER]
    );
    assert_eq!(
        roles_of(&directory, SECONDARY, BO),
        vec![SENIOR_PILOT, SECONDARY_ENGINEER]
    );
}

#[tokio::test]
async fn test_snapshot_file_round_trip_through_service() {
    let temp = TempDir::new().unwrap();
    let settings = write_config(temp.path());
    let snapshot = temp.path().join("directory.yaml");
    rolesync_fs::ConfigStore::new()
        .save(&snapshot, &fleet::snapshot())
        .unwrap();

    let directory = Arc::new(MemoryDirectory::load(&snapshot).unwrap());
    let (queue, worker) = start(&settings, &directory);
    queue.command(admin("addsyncrole", &["10"])).await.unwrap();
    queue.reconcile(SyncOptions::default()).await.unwrap();
    drop(queue);
    worker.await.unwrap();
    directory.save(&snapshot).unwrap();

    let reloaded = MemoryDirectory::load(&snapshot).unwrap();
    assert_eq!(roles_of(&reloaded, SECONDARY, ANA), vec![SENIOR_PILOT]);
    assert!(roles_of(&reloaded, SECONDARY, CY).is_empty());
}
