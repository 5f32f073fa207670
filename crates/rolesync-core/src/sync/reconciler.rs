//! Full reconciliation sweep
//!
//! For every member of the primary group that also belongs to the secondary
//! group, and for every synchronized role with a resolvable equivalent, the
//! sweep adds or removes the secondary role until both sides agree. The
//! primary group wins on drift.
//!
//! Several synchronized roles may map onto the same secondary role. The
//! member then needs that secondary role while holding any one of them.

use std::collections::BTreeSet;

use crate::directory::{GroupDirectory, OperationKind};
use crate::matcher::RoleMatcher;
use crate::model::{GroupPair, RoleId};

use super::{Equivalence, SyncOptions, SyncReport, apply_change, resolve_equivalence};

/// Sweeps both groups and converges the secondary toward the primary
pub struct Reconciler<'a> {
    directory: &'a dyn GroupDirectory,
    matcher: &'a dyn RoleMatcher,
    groups: GroupPair,
}

impl<'a> Reconciler<'a> {
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

    /// Run one sweep over `sync_roles`.
    ///
    /// Never fails: an unresolvable group yields a skipped report, and
    /// per-member or per-role failures are recorded while the sweep carries
    /// on. Running twice over unchanged state issues no operations the
    /// second time.
    pub async fn reconcile_all(&self, sync_roles: &[RoleId], options: &SyncOptions) -> SyncReport {
        tracing::info!(roles = sync_roles.len(), dry_run = options.dry_run, "reconciliation started");

        for (label, group) in [("primary", self.groups.primary), ("secondary", self.groups.secondary)] {
            match self.directory.resolve_group(group).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(%group, "{label} group not found, skipping reconciliation");
                    return SyncReport::skipped(format!("{label} group {group} not found"));
                }
                Err(e) => {
                    tracing::warn!(%group, error = %e, "{label} group unavailable, skipping reconciliation");
                    return SyncReport::skipped(format!("{label} group {group} unavailable: {e}"));
                }
            }
        }

        let mut report = SyncReport::new(options.dry_run);

        let equivalences = match self.resolve_all(sync_roles, &mut report).await {
            Some(equivalences) => equivalences,
            None => return report,
        };
        if equivalences.is_empty() {
            tracing::info!("no synchronized role has a secondary equivalent");
            return report;
        }

        let members = match self.directory.list_members(self.groups.primary).await {
            Ok(members) => members,
            Err(e) => {
                tracing::error!(error = %e, "failed to list primary members");
                report.fail(None, None, format!("listing primary members: {e}"));
                return report;
            }
        };

        for member in &members {
            let secondary_member = match self
                .directory
                .get_member(self.groups.secondary, member.user)
                .await
            {
                Ok(Some(m)) => m,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(user = %member.user, error = %e, "failed to look up secondary member");
                    report.fail(Some(member.user), None, e.to_string());
                    continue;
                }
            };

            // one decision per secondary role; it is held on the primary side
            // if any synchronized role mapping onto it is held
            let mut decided = BTreeSet::new();
            for equivalence in &equivalences {
                if !decided.insert(equivalence.secondary.id) {
                    continue;
                }
                let held = equivalences
                    .iter()
                    .filter(|e| e.secondary.id == equivalence.secondary.id)
                    .find(|e| member.has_role(e.primary.id));
                let has_secondary = secondary_member.has_role(equivalence.secondary.id);

                let (kind, source) = match (held, has_secondary) {
                    (Some(held), false) => (OperationKind::Add, held),
                    (None, true) => (OperationKind::Remove, equivalence),
                    _ => continue,
                };

                apply_change(
                    self.directory,
                    self.groups.secondary,
                    kind,
                    member,
                    source,
                    options.dry_run,
                    &mut report,
                )
                .await;
            }
        }

        tracing::info!(summary = %report.summary(), "reconciliation finished");
        report
    }

    /// Resolve the sweep's equivalences. `None` if the secondary role list
    /// itself is unavailable.
    async fn resolve_all(
        &self,
        sync_roles: &[RoleId],
        report: &mut SyncReport,
    ) -> Option<Vec<Equivalence>> {
        let secondary_roles = match self.directory.list_roles(self.groups.secondary).await {
            Ok(roles) => roles,
            Err(e) => {
                tracing::error!(error = %e, "failed to list secondary roles");
                report.fail(None, None, format!("listing secondary roles: {e}"));
                return None;
            }
        };

        let mut equivalences = Vec::with_capacity(sync_roles.len());
        for &role in sync_roles {
            match resolve_equivalence(
                self.directory,
                self.matcher,
                self.groups.primary,
                role,
                &secondary_roles,
            )
            .await
            {
                Ok(Some(equivalence)) => equivalences.push(equivalence),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(%role, error = %e, "failed to resolve synchronized role");
                    report.fail(None, Some(role), e.to_string());
                }
            }
        }
        Some(equivalences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectorySnapshot, GroupSnapshot, MemoryDirectory, Operation};
    use crate::matcher::ContainmentMatcher;
    use crate::model::{GroupId, Member};
    use pretty_assertions::assert_eq;

    const PRIMARY: u64 = 1;
    const SECONDARY: u64 = 2;

    fn groups() -> GroupPair {
        GroupPair {
            primary: GroupId(PRIMARY),
            secondary: GroupId(SECONDARY),
        }
    }

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new(
            DirectorySnapshot::new()
                .with_group(
                    GroupSnapshot::new(PRIMARY, "Fleet")
                        .with_role(10, "Pilot")
                        .with_role(11, "Engineer")
                        .with_member(Member::new(100, "ana").with_roles([10]))
                        .with_member(Member::new(101, "bo").with_roles([11]))
                        .with_member(Member::new(102, "cy").with_roles([10, 11])),
                )
                .with_group(
                    GroupSnapshot::new(SECONDARY, "Fleet Ops")
                        .with_role(20, "Senior Pilot")
                        .with_role(21, "Engineer")
                        .with_member(Member::new(100, "ana"))
                        .with_member(Member::new(101, "bo").with_roles([20, 21])),
                ),
        )
    }

    #[tokio::test]
    async fn test_sweep_adds_and_removes() {
        let dir = directory();
        let matcher = ContainmentMatcher::new();
        let reconciler = Reconciler::new(&dir, &matcher, groups());

        let report = reconciler
            .reconcile_all(&[RoleId(10), RoleId(11)], &SyncOptions::default())
            .await;

        // cy has no secondary identity and is skipped
        assert!(report.is_success());
        assert_eq!(
            dir.operations(),
            vec![Operation::add(SECONDARY, 100, 20), Operation::remove(SECONDARY, 101, 20)]
        );
    }

    #[tokio::test]
    async fn test_second_sweep_is_a_noop() {
        let dir = directory();
        let matcher = ContainmentMatcher::new();
        let reconciler = Reconciler::new(&dir, &matcher, groups());
        let roles = [RoleId(10), RoleId(11)];

        reconciler.reconcile_all(&roles, &SyncOptions::default()).await;
        dir.take_operations();
        let second = reconciler.reconcile_all(&roles, &SyncOptions::default()).await;

        assert!(second.changes.is_empty());
        assert!(dir.operations().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_mutating() {
        let dir = directory();
        let matcher = ContainmentMatcher::new();
        let reconciler = Reconciler::new(&dir, &matcher, groups());

        let report = reconciler
            .reconcile_all(&[RoleId(10)], &SyncOptions::dry_run())
            .await;

        assert_eq!(report.changes.len(), 2);
        assert!(report.dry_run);
        assert!(dir.operations().is_empty());
    }

    #[tokio::test]
    async fn test_missing_secondary_group_is_skipped() {
        let dir = directory();
        let matcher = ContainmentMatcher::new();
        let pair = GroupPair {
            primary: GroupId(PRIMARY),
            secondary: GroupId(999),
        };

        let report = Reconciler::new(&dir, &matcher, pair)
            .reconcile_all(&[RoleId(10)], &SyncOptions::default())
            .await;

        assert!(report.skipped.is_some());
        assert!(dir.operations().is_empty());
    }

    #[tokio::test]
    async fn test_stale_role_does_not_block_others() {
        let dir = directory();
        let matcher = ContainmentMatcher::new();

        let report = Reconciler::new(&dir, &matcher, groups())
            .reconcile_all(&[RoleId(404), RoleId(10)], &SyncOptions::default())
            .await;

        assert!(report.is_success());
        assert_eq!(report.changes.len(), 2);
    }

    #[tokio::test]
    async fn test_shared_secondary_role_settles_after_one_sweep() {
        // "Officer" and "Junior Officer" both map onto "Junior Officer"
        let dir = MemoryDirectory::new(
            DirectorySnapshot::new()
                .with_group(
                    GroupSnapshot::new(PRIMARY, "Fleet")
                        .with_role(12, "Officer")
                        .with_role(14, "Junior Officer")
                        .with_member(Member::new(100, "ana").with_roles([12])),
                )
                .with_group(
                    GroupSnapshot::new(SECONDARY, "Fleet Ops")
                        .with_role(20, "Junior Officer")
                        .with_member(Member::new(100, "ana")),
                ),
        );
        let matcher = ContainmentMatcher::new();
        let reconciler = Reconciler::new(&dir, &matcher, groups());
        let roles = [RoleId(12), RoleId(14)];

        let first = reconciler.reconcile_all(&roles, &SyncOptions::default()).await;
        assert_eq!(dir.take_operations(), vec![Operation::add(SECONDARY, 100, 20)]);
        assert_eq!(first.changes[0].primary_role, RoleId(12));

        for _ in 0..2 {
            let next = reconciler.reconcile_all(&roles, &SyncOptions::default()).await;
            assert!(next.changes.is_empty());
        }
        assert!(dir.operations().is_empty());
    }

    #[tokio::test]
    async fn test_failed_add_continues_sweep() {
        let dir = directory();
        dir.fail_on(GroupId(SECONDARY), crate::model::UserId(100), RoleId(20));
        let matcher = ContainmentMatcher::new();

        let report = Reconciler::new(&dir, &matcher, groups())
            .reconcile_all(&[RoleId(10)], &SyncOptions::default())
            .await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.removals(), 1);
        assert!(!report.is_success());
    }
}
