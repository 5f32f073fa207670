//! Sync Registry: the persisted set of synchronized role ids
//!
//! The registry is the only durable state the engine owns. It persists to a
//! single JSON array of primary-group role ids and is rewritten in full after
//! every successful mutation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::Result;
use crate::model::RoleId;

/// Set of primary-group role ids subject to synchronization
#[derive(Debug, Clone)]
pub struct SyncRegistry {
    path: PathBuf,
    roles: BTreeSet<RoleId>,
}

impl SyncRegistry {
    /// Create an empty registry backed by `path` without touching disk
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            roles: BTreeSet::new(),
        }
    }

    /// Load the registry from disk.
    ///
    /// A missing, unreadable or corrupt file yields an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let roles = match rolesync_fs::io::read_text(&path) {
            Ok(content) => match serde_json::from_str::<Vec<RoleId>>(&content) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "sync role file is corrupt, starting empty");
                    BTreeSet::new()
                }
            },
            Err(rolesync_fs::Error::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(path = %path.display(), "no sync role file, starting empty");
                BTreeSet::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "sync role file is unreadable, starting empty");
                BTreeSet::new()
            }
        };

        tracing::info!(path = %path.display(), count = roles.len(), "loaded sync roles");
        Self { path, roles }
    }

    /// Add a role id. Returns `false` if it was already present.
    ///
    /// If persisting fails the insert is rolled back.
    pub fn add(&mut self, role: RoleId) -> Result<bool> {
        if !self.roles.insert(role) {
            return Ok(false);
        }
        if let Err(e) = self.save() {
            self.roles.remove(&role);
            return Err(e);
        }
        tracing::info!(%role, "role added to sync registry");
        Ok(true)
    }

    /// Remove a role id. Returns `false` if it was absent.
    ///
    /// If persisting fails the removal is rolled back.
    pub fn remove(&mut self, role: RoleId) -> Result<bool> {
        if !self.roles.remove(&role) {
            return Ok(false);
        }
        if let Err(e) = self.save() {
            self.roles.insert(role);
            return Err(e);
        }
        tracing::info!(%role, "role removed from sync registry");
        Ok(true)
    }

    pub fn contains(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.roles.iter().copied()
    }

    /// Sorted snapshot of the registered ids
    pub fn role_ids(&self) -> Vec<RoleId> {
        self.iter().collect()
    }

    pub fn as_set(&self) -> &BTreeSet<RoleId> {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_vec(&self.role_ids())?;
        rolesync_fs::io::write_atomic(&self.path, &content)?;
        Ok(())
    }
}
