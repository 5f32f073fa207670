//! [`TestWorld`] builder for rolesync test scenarios.

use std::path::PathBuf;
use std::sync::Arc;

use rolesync_core::{
    Coordinator, DirectorySnapshot, GroupId, MemoryDirectory, RoleId, Settings, SyncRegistry,
};
use tempfile::TempDir;

use crate::fleet;

/// A temporary directory holding a registry file, plus an in-memory
/// directory and matching settings.
///
/// # Example
///
/// ```rust,no_run
/// use rolesync_test_utils::{TestWorld, fleet};
///
/// let world = TestWorld::fleet().with_sync_roles(&[fleet::PILOT]);
/// let coordinator = world.coordinator();
/// ```
pub struct TestWorld {
    // deleted on drop
    _temp_dir: TempDir,
    pub directory: Arc<MemoryDirectory>,
    pub settings: Settings,
}

impl TestWorld {
    /// World over an arbitrary snapshot using the fleet group ids
    pub fn new(snapshot: DirectorySnapshot) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = Settings::new(GroupId(fleet::PRIMARY), GroupId(fleet::SECONDARY));
        settings.registry.path = temp_dir.path().join("sync_roles.json");

        Self {
            _temp_dir: temp_dir,
            directory: Arc::new(MemoryDirectory::new(snapshot)),
            settings,
        }
    }

    /// World over the canned [`fleet`] snapshot
    pub fn fleet() -> Self {
        Self::new(fleet::snapshot())
    }

    /// Persist these ids as the registry contents
    pub fn with_sync_roles(self, roles: &[RoleId]) -> Self {
        let mut registry = SyncRegistry::new(self.registry_path());
        for role in roles {
            registry.add(*role).unwrap();
        }
        self
    }

    pub fn registry_path(&self) -> PathBuf {
        self.settings.registry.path.clone()
    }

    /// Load the registry from disk as a restart would
    pub fn load_registry(&self) -> SyncRegistry {
        SyncRegistry::load(self.registry_path())
    }

    /// Fresh coordinator reading the registry from disk
    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(self.directory.clone(), self.load_registry(), &self.settings)
    }

    /// Roles a member currently holds in a group
    pub fn roles_of(&self, group: u64, user: rolesync_core::UserId) -> Vec<RoleId> {
        let snapshot = self.directory.snapshot().unwrap();
        snapshot
            .group(GroupId(group))
            .and_then(|g| g.member(user))
            .map(|m| m.roles.iter().copied().collect())
            .unwrap_or_default()
    }
}
