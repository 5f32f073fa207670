//! In-memory group directory backed by a serializable snapshot
//!
//! Used by the CLI in place of a live gateway and by tests. Every mutation
//! call is recorded in an operation log, and a [`MemberUpdate`] is published
//! whenever a member's role set actually changes.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::GroupDirectory;
use crate::model::{GroupId, GroupInfo, Member, MemberUpdate, Role, RoleId, UserId};
use crate::{Error, Result};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Most recent mutation calls kept in the operation log
const OPERATION_LOG_CAPACITY: usize = 1024;

/// Full state of every group the directory knows about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub groups: Vec<GroupSnapshot>,
}

impl DirectorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: GroupSnapshot) -> Self {
        self.groups.push(group);
        self
    }

    pub fn group(&self, id: GroupId) -> Option<&GroupSnapshot> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut GroupSnapshot> {
        self.groups.iter_mut().find(|g| g.id == id)
    }
}

/// One group: its ordered roles and its members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl GroupSnapshot {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: GroupId(id),
            name: name.into(),
            roles: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn with_role(mut self, id: u64, name: impl Into<String>) -> Self {
        self.roles.push(Role::new(id, name));
        self
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn member(&self, user: UserId) -> Option<&Member> {
        self.members.iter().find(|m| m.user == user)
    }

    pub fn role(&self, role: RoleId) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Remove,
}

/// A mutation call issued against the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub group: GroupId,
    pub user: UserId,
    pub role: RoleId,
}

impl Operation {
    pub fn new(kind: OperationKind, group: GroupId, user: UserId, role: RoleId) -> Self {
        Self {
            kind,
            group,
            user,
            role,
        }
    }

    /// Add operation from raw ids
    pub fn add(group: u64, user: u64, role: u64) -> Self {
        Self::new(OperationKind::Add, GroupId(group), UserId(user), RoleId(role))
    }

    /// Remove operation from raw ids
    pub fn remove(group: u64, user: u64, role: u64) -> Self {
        Self::new(OperationKind::Remove, GroupId(group), UserId(user), RoleId(role))
    }
}

/// [`GroupDirectory`] over an in-memory [`DirectorySnapshot`]
pub struct MemoryDirectory {
    state: RwLock<DirectorySnapshot>,
    operations: Mutex<VecDeque<Operation>>,
    log_capacity: usize,
    failures: Mutex<HashSet<(GroupId, UserId, RoleId)>>,
    updates: broadcast::Sender<MemberUpdate>,
}

impl MemoryDirectory {
    pub fn new(snapshot: DirectorySnapshot) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(snapshot),
            operations: Mutex::new(VecDeque::new()),
            log_capacity: OPERATION_LOG_CAPACITY,
            failures: Mutex::new(HashSet::new()),
            updates,
        }
    }

    /// Load a snapshot file (format by extension)
    pub fn load(path: &Path) -> Result<Self> {
        let snapshot: DirectorySnapshot = rolesync_fs::ConfigStore::new().load(path)?;
        tracing::debug!(path = %path.display(), groups = snapshot.groups.len(), "loaded directory snapshot");
        Ok(Self::new(snapshot))
    }

    /// Write the current state back to a snapshot file
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot()?;
        rolesync_fs::ConfigStore::new().save(path, &snapshot)?;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<DirectorySnapshot> {
        Ok(self.read()?.clone())
    }

    /// Receive a [`MemberUpdate`] for every effective role-set change
    pub fn subscribe(&self) -> broadcast::Receiver<MemberUpdate> {
        self.updates.subscribe()
    }

    /// Keep at most `capacity` entries in the operation log, dropping the oldest
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Recent mutation calls, oldest first, including failed ones
    pub fn operations(&self) -> Vec<Operation> {
        self.operations
            .lock()
            .map(|ops| ops.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drain the operation log
    pub fn take_operations(&self) -> Vec<Operation> {
        self.operations
            .lock()
            .map(|mut ops| ops.drain(..).collect())
            .unwrap_or_default()
    }

    /// Make every mutation call for this (group, user, role) fail
    pub fn fail_on(&self, group: GroupId, user: UserId, role: RoleId) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert((group, user, role));
        }
    }

    /// Replace a member's role set, as an external actor would.
    ///
    /// Publishes the resulting update if anything changed and returns it.
    pub fn set_member_roles(
        &self,
        group: GroupId,
        user: UserId,
        roles: BTreeSet<RoleId>,
    ) -> Result<MemberUpdate> {
        let update = {
            let mut state = self.write()?;
            let group_state = state.group_mut(group).ok_or(Error::GroupNotFound(group))?;
            let member = group_state
                .members
                .iter_mut()
                .find(|m| m.user == user)
                .ok_or(Error::MemberNotFound { group, user })?;

            let before = member.clone();
            member.roles = roles;
            MemberUpdate {
                group,
                before,
                after: member.clone(),
            }
        };

        if update.before != update.after {
            self.publish(update.clone());
        }
        Ok(update)
    }

    /// Delete a role from a group and from every member holding it
    pub fn delete_role(&self, group: GroupId, role: RoleId) -> Result<()> {
        let mut state = self.write()?;
        let group_state = state.group_mut(group).ok_or(Error::GroupNotFound(group))?;
        group_state.roles.retain(|r| r.id != role);
        for member in &mut group_state.members {
            member.roles.remove(&role);
        }
        Ok(())
    }

    /// Rename a role in place
    pub fn rename_role(&self, group: GroupId, role: RoleId, name: &str) -> Result<()> {
        let mut state = self.write()?;
        let group_state = state.group_mut(group).ok_or(Error::GroupNotFound(group))?;
        let entry = group_state
            .roles
            .iter_mut()
            .find(|r| r.id == role)
            .ok_or(Error::RoleNotFound { group, role })?;
        entry.name = name.to_string();
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DirectorySnapshot>> {
        self.state
            .read()
            .map_err(|_| Error::directory("read", "directory state lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DirectorySnapshot>> {
        self.state
            .write()
            .map_err(|_| Error::directory("write", "directory state lock poisoned"))
    }

    fn publish(&self, update: MemberUpdate) {
        // No receivers is fine; nobody is listening yet
        let _ = self.updates.send(update);
    }

    fn apply(&self, operation: Operation) -> Result<()> {
        if let Ok(mut ops) = self.operations.lock() {
            ops.push_back(operation);
            while ops.len() > self.log_capacity {
                ops.pop_front();
            }
        }

        let Operation {
            kind,
            group,
            user,
            role,
        } = operation;
        let op_name = match kind {
            OperationKind::Add => "add_role_to_member",
            OperationKind::Remove => "remove_role_from_member",
        };

        let injected = self
            .failures
            .lock()
            .map(|f| f.contains(&(group, user, role)))
            .unwrap_or(false);
        if injected {
            return Err(Error::directory(op_name, format!("injected failure for user {user} role {role}")));
        }

        let update = {
            let mut state = self.write()?;
            let group_state = state.group_mut(group).ok_or(Error::GroupNotFound(group))?;
            if group_state.role(role).is_none() {
                return Err(Error::RoleNotFound { group, role });
            }
            let member = group_state
                .members
                .iter_mut()
                .find(|m| m.user == user)
                .ok_or(Error::MemberNotFound { group, user })?;

            let before = member.clone();
            let changed = match kind {
                OperationKind::Add => member.roles.insert(role),
                OperationKind::Remove => member.roles.remove(&role),
            };
            changed.then(|| MemberUpdate {
                group,
                before,
                after: member.clone(),
            })
        };

        if let Some(update) = update {
            self.publish(update);
        }
        Ok(())
    }
}

#[async_trait]
impl GroupDirectory for MemoryDirectory {
    async fn resolve_group(&self, group: GroupId) -> Result<Option<GroupInfo>> {
        Ok(self.read()?.group(group).map(|g| GroupInfo {
            id: g.id,
            name: g.name.clone(),
        }))
    }

    async fn list_members(&self, group: GroupId) -> Result<Vec<Member>> {
        self.read()?
            .group(group)
            .map(|g| g.members.clone())
            .ok_or(Error::GroupNotFound(group))
    }

    async fn get_member(&self, group: GroupId, user: UserId) -> Result<Option<Member>> {
        Ok(self
            .read()?
            .group(group)
            .and_then(|g| g.member(user))
            .cloned())
    }

    async fn list_roles(&self, group: GroupId) -> Result<Vec<Role>> {
        self.read()?
            .group(group)
            .map(|g| g.roles.clone())
            .ok_or(Error::GroupNotFound(group))
    }

    async fn get_role(&self, group: GroupId, role: RoleId) -> Result<Option<Role>> {
        Ok(self.read()?.group(group).and_then(|g| g.role(role)).cloned())
    }

    async fn add_role_to_member(&self, group: GroupId, user: UserId, role: RoleId) -> Result<()> {
        self.apply(Operation::new(OperationKind::Add, group, user, role))
    }

    async fn remove_role_from_member(
        &self,
        group: GroupId,
        user: UserId,
        role: RoleId,
    ) -> Result<()> {
        self.apply(Operation::new(OperationKind::Remove, group, user, role))
    }
}
