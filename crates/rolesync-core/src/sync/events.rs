//! Incremental sync for a single member's role-set change

use std::collections::BTreeSet;

use crate::directory::{GroupDirectory, OperationKind};
use crate::matcher::RoleMatcher;
use crate::Result;
use crate::model::{GroupPair, Member, MemberUpdate, Role, RoleId};

use super::{SyncReport, apply_change, resolve_equivalence};

/// Synchronized roles gained and lost in one update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDelta {
    pub added: Vec<RoleId>,
    pub removed: Vec<RoleId>,
}

impl RoleDelta {
    /// Roles in `after` but not `before` (and the reverse), restricted to `sync_roles`
    pub fn compute(before: &Member, after: &Member, sync_roles: &BTreeSet<RoleId>) -> Self {
        let added = after
            .roles
            .difference(&before.roles)
            .filter(|r| sync_roles.contains(r))
            .copied()
            .collect();
        let removed = before
            .roles
            .difference(&after.roles)
            .filter(|r| sync_roles.contains(r))
            .copied()
            .collect();
        Self { added, removed }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Applies the delta of one primary-group update to the secondary member
///
/// The handler does not consult the auto-sync flag; callers decide whether
/// to invoke it.
pub struct EventHandler<'a> {
    directory: &'a dyn GroupDirectory,
    matcher: &'a dyn RoleMatcher,
    groups: GroupPair,
}

impl<'a> EventHandler<'a> {
    pub fn new(
        directory: &'a dyn GroupDirectory,
        matcher: &'a dyn RoleMatcher,
        groups: GroupPair,
    ) -> Self {
        Self {
            directory,
            matcher,
            groups,
        }
    }

    pub async fn on_primary_role_change(
        &self,
        update: &MemberUpdate,
        sync_roles: &BTreeSet<RoleId>,
    ) -> SyncReport {
        let mut report = SyncReport::new(false);

        if update.group != self.groups.primary {
            tracing::trace!(group = %update.group, "ignoring update from non-primary group");
            return report;
        }

        let delta = RoleDelta::compute(&update.before, &update.after, sync_roles);
        if delta.is_empty() {
            return report;
        }

        let user = update.after.user;
        tracing::debug!(%user, added = ?delta.added, removed = ?delta.removed, "primary role change");

        match self.directory.resolve_group(self.groups.secondary).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(group = %self.groups.secondary, "secondary group not found, dropping update");
                return SyncReport::skipped("secondary group not found");
            }
            Err(e) => {
                tracing::warn!(error = %e, "secondary group unavailable, dropping update");
                return SyncReport::skipped(format!("secondary group unavailable: {e}"));
            }
        }

        let secondary_member = match self.directory.get_member(self.groups.secondary, user).await {
            Ok(Some(m)) => m,
            Ok(None) => {
                tracing::debug!(%user, "member has no secondary identity");
                return report;
            }
            Err(e) => {
                tracing::error!(%user, error = %e, "failed to look up secondary member");
                report.fail(Some(user), None, e.to_string());
                return report;
            }
        };

        let secondary_roles = match self.directory.list_roles(self.groups.secondary).await {
            Ok(roles) => roles,
            Err(e) => {
                tracing::error!(error = %e, "failed to list secondary roles");
                report.fail(Some(user), None, e.to_string());
                return report;
            }
        };

        // secondary roles still covered by a synchronized role the member keeps
        let retained = if delta.removed.is_empty() {
            BTreeSet::new()
        } else {
            match self
                .retained_targets(&update.after, sync_roles, &secondary_roles)
                .await
            {
                Ok(retained) => retained,
                Err(e) => {
                    tracing::error!(%user, error = %e, "failed to resolve retained roles, skipping removals");
                    report.fail(Some(user), None, e.to_string());
                    return report;
                }
            }
        };

        let items = delta
            .added
            .iter()
            .map(|r| (*r, OperationKind::Add))
            .chain(delta.removed.iter().map(|r| (*r, OperationKind::Remove)));

        for (role, kind) in items {
            let equivalence = match resolve_equivalence(
                self.directory,
                self.matcher,
                self.groups.primary,
                role,
                &secondary_roles,
            )
            .await
            {
                Ok(Some(e)) => e,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(%role, error = %e, "failed to resolve synchronized role");
                    report.fail(Some(user), Some(role), e.to_string());
                    continue;
                }
            };

            let holds = secondary_member.has_role(equivalence.secondary.id);
            let needed = match kind {
                OperationKind::Add => !holds,
                OperationKind::Remove => holds && !retained.contains(&equivalence.secondary.id),
            };
            if !needed {
                continue;
            }

            apply_change(
                self.directory,
                self.groups.secondary,
                kind,
                &update.after,
                &equivalence,
                false,
                &mut report,
            )
            .await;
        }

        report
    }

    /// Secondary role ids that some synchronized role held by `member` maps onto
    async fn retained_targets(
        &self,
        member: &Member,
        sync_roles: &BTreeSet<RoleId>,
        secondary_roles: &[Role],
    ) -> Result<BTreeSet<RoleId>> {
        let mut retained = BTreeSet::new();
        for &role in member.roles.intersection(sync_roles) {
            if let Some(equivalence) = resolve_equivalence(
                self.directory,
                self.matcher,
                self.groups.primary,
                role,
                secondary_roles,
            )
            .await?
            {
                retained.insert(equivalence.secondary.id);
            }
        }
        Ok(retained)
    }
}
