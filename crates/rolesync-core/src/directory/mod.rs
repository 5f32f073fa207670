//! Group Directory abstraction
//!
//! The engine never caches group state. Every sweep and every event reads
//! live through a [`GroupDirectory`], which is the seam to whatever
//! messaging gateway actually hosts the groups.

mod memory;

pub use memory::{DirectorySnapshot, GroupSnapshot, MemoryDirectory, Operation, OperationKind};

use async_trait::async_trait;

use crate::Result;
use crate::model::{GroupId, GroupInfo, Member, Role, RoleId, UserId};

/// Access to group membership state
///
/// Lookups return `Ok(None)` for absent objects; `Err` is reserved for the
/// collaborator itself failing. `add_role_to_member` and
/// `remove_role_from_member` must be idempotent.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn resolve_group(&self, group: GroupId) -> Result<Option<GroupInfo>>;

    async fn list_members(&self, group: GroupId) -> Result<Vec<Member>>;

    async fn get_member(&self, group: GroupId, user: UserId) -> Result<Option<Member>>;

    /// Roles in the group's native order
    async fn list_roles(&self, group: GroupId) -> Result<Vec<Role>>;

    async fn get_role(&self, group: GroupId, role: RoleId) -> Result<Option<Role>>;

    async fn add_role_to_member(&self, group: GroupId, user: UserId, role: RoleId) -> Result<()>;

    async fn remove_role_from_member(
        &self,
        group: GroupId,
        user: UserId,
        role: RoleId,
    ) -> Result<()>;
}
