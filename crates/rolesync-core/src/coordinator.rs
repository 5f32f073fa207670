//! Coordinator: owner of all mutable service state
//!
//! One coordinator holds the registry, the auto-sync flag, the matching
//! strategy and the directory handle. The event handler, the reconciler, and
//! the control surface all borrow from it; there is no global state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::Result;
use crate::config::Settings;
use crate::directory::GroupDirectory;
use crate::matcher::RoleMatcher;
use crate::model::{GroupId, GroupPair, MemberUpdate, RoleId};
use crate::registry::SyncRegistry;
use crate::sync::{EventHandler, Reconciler, SyncOptions, SyncReport};

pub struct Coordinator {
    directory: Arc<dyn GroupDirectory>,
    matcher: Box<dyn RoleMatcher>,
    groups: GroupPair,
    command_group: Option<GroupId>,
    registry: Mutex<SyncRegistry>,
    auto_sync: AtomicBool,
}

impl Coordinator {
    pub fn new(directory: Arc<dyn GroupDirectory>, registry: SyncRegistry, settings: &Settings) -> Self {
        Self {
            directory,
            matcher: Box::new(settings.matcher()),
            groups: settings.group_pair(),
            command_group: settings.groups.commands,
            registry: Mutex::new(registry),
            auto_sync: AtomicBool::new(settings.sync.auto_sync),
        }
    }

    /// Replace the matching strategy
    pub fn with_matcher(mut self, matcher: impl RoleMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn groups(&self) -> GroupPair {
        self.groups
    }

    pub fn command_group(&self) -> Option<GroupId> {
        self.command_group
    }

    pub fn directory(&self) -> &dyn GroupDirectory {
        self.directory.as_ref()
    }

    pub fn auto_sync_enabled(&self) -> bool {
        self.auto_sync.load(Ordering::Relaxed)
    }

    pub fn set_auto_sync(&self, enabled: bool) {
        self.auto_sync.store(enabled, Ordering::Relaxed);
        tracing::info!(enabled, "automatic sync toggled");
    }

    /// Sorted snapshot of the synchronized role ids
    pub fn sync_roles(&self) -> Vec<RoleId> {
        self.registry().role_ids()
    }

    pub fn is_sync_role(&self, role: RoleId) -> bool {
        self.registry().contains(role)
    }

    pub fn add_sync_role(&self, role: RoleId) -> Result<bool> {
        self.registry().add(role)
    }

    pub fn remove_sync_role(&self, role: RoleId) -> Result<bool> {
        self.registry().remove(role)
    }

    /// Full sweep. Ignores the auto-sync flag.
    pub async fn reconcile(&self, options: &SyncOptions) -> SyncReport {
        let roles = self.sync_roles();
        Reconciler::new(self.directory.as_ref(), self.matcher.as_ref(), self.groups)
            .reconcile_all(&roles, options)
            .await
    }

    /// Event-driven path, gated by the auto-sync flag.
    ///
    /// Returns `None` without touching the directory while auto-sync is off.
    pub async fn handle_member_update(&self, update: &MemberUpdate) -> Option<SyncReport> {
        if !self.auto_sync_enabled() {
            tracing::debug!(user = %update.after.user, "automatic sync disabled, ignoring update");
            return None;
        }

        let roles = self.registry().as_set().clone();
        let report = EventHandler::new(self.directory.as_ref(), self.matcher.as_ref(), self.groups)
            .on_primary_role_change(update, &roles)
            .await;
        Some(report)
    }

    fn registry(&self) -> MutexGuard<'_, SyncRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
