//! Role synchronization between the primary and secondary group
//!
//! This module provides:
//! - **reconciler**: full sweep converging every shared member
//! - **events**: incremental update for one member's role-set change
//! - **report**: what a sweep or event changed, planned, or failed on
//!
//! Equivalences are resolved fresh for every sweep and every event, never
//! cached across calls, since secondary role names can change at any time.

mod events;
mod reconciler;
mod report;

pub use events::{EventHandler, RoleDelta};
pub use reconciler::Reconciler;
pub use report::{RoleChange, SyncFailure, SyncReport};

use crate::directory::{GroupDirectory, OperationKind};
use crate::matcher::RoleMatcher;
use crate::model::{GroupId, Member, Role, RoleId};

/// Options for sweeps
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// If true, record planned changes without mutating the directory
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// A primary role and the secondary role it maps onto
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Equivalence {
    pub primary: Role,
    pub secondary: Role,
}

/// Resolve the secondary equivalent of one synchronized role.
///
/// `Ok(None)` covers both a stale primary id and a name with no match.
pub(crate) async fn resolve_equivalence(
    directory: &dyn GroupDirectory,
    matcher: &dyn RoleMatcher,
    primary_group: GroupId,
    role: RoleId,
    secondary_roles: &[Role],
) -> crate::Result<Option<Equivalence>> {
    let Some(primary) = directory.get_role(primary_group, role).await? else {
        tracing::debug!(%role, "synchronized role no longer exists in primary group, skipping");
        return Ok(None);
    };

    let Some(secondary_id) = matcher.find_equivalent(&primary.name, secondary_roles) else {
        tracing::debug!(%role, name = %primary.name, "no equivalent role in secondary group, skipping");
        return Ok(None);
    };

    let secondary = secondary_roles
        .iter()
        .find(|r| r.id == secondary_id)
        .cloned()
        .ok_or_else(|| {
            crate::Error::directory("match", format!("matcher returned unknown role {secondary_id}"))
        })?;

    Ok(Some(Equivalence { primary, secondary }))
}

/// Issue one corrective change on the secondary member and record it.
///
/// Failures are recorded in the report; they never propagate.
pub(crate) async fn apply_change(
    directory: &dyn GroupDirectory,
    secondary_group: GroupId,
    kind: OperationKind,
    member: &Member,
    equivalence: &Equivalence,
    dry_run: bool,
    report: &mut SyncReport,
) {
    let change = RoleChange {
        kind,
        user: member.user,
        member: member.name.clone(),
        primary_role: equivalence.primary.id,
        secondary_role: equivalence.secondary.id,
        role_name: equivalence.secondary.name.clone(),
    };

    if dry_run {
        tracing::info!(user = %member.user, role = %equivalence.secondary.name, ?kind, "[dry-run] would change role");
        report.changes.push(change);
        return;
    }

    let result = match kind {
        OperationKind::Add => {
            directory
                .add_role_to_member(secondary_group, member.user, equivalence.secondary.id)
                .await
        }
        OperationKind::Remove => {
            directory
                .remove_role_from_member(secondary_group, member.user, equivalence.secondary.id)
                .await
        }
    };

    match result {
        Ok(()) => {
            match kind {
                OperationKind::Add => tracing::info!(
                    user = %member.user,
                    member = %member.name,
                    role = %equivalence.secondary.name,
                    "role added in secondary group"
                ),
                OperationKind::Remove => tracing::info!(
                    user = %member.user,
                    member = %member.name,
                    role = %equivalence.secondary.name,
                    "role removed in secondary group"
                ),
            }
            report.changes.push(change);
        }
        Err(e) => {
            tracing::error!(
                user = %member.user,
                role = %equivalence.secondary.id,
                error = %e,
                "failed to update role in secondary group"
            );
            report.fail(Some(member.user), Some(equivalence.secondary.id), e.to_string());
        }
    }
}
