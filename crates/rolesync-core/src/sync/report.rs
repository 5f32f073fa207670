//! Reports produced by sweeps and event handling

use serde::{Deserialize, Serialize};

use crate::directory::OperationKind;
use crate::model::{RoleId, UserId};

/// One corrective change on the secondary group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChange {
    pub kind: OperationKind,
    pub user: UserId,
    /// Member display name in the primary group
    pub member: String,
    pub primary_role: RoleId,
    pub secondary_role: RoleId,
    /// Secondary role display name
    pub role_name: String,
}

/// A unit of work that could not be completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub user: Option<UserId>,
    pub role: Option<RoleId>,
    pub message: String,
}

/// Outcome of a sweep or of one member update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Changes applied, or planned when `dry_run` is set
    pub changes: Vec<RoleChange>,
    pub failures: Vec<SyncFailure>,
    /// Set when the whole operation was skipped
    pub skipped: Option<String>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Report for an operation that did not run at all
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.skipped.is_none() && self.failures.is_empty()
    }

    pub fn additions(&self) -> usize {
        self.count(OperationKind::Add)
    }

    pub fn removals(&self) -> usize {
        self.count(OperationKind::Remove)
    }

    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        if let Some(reason) = &self.skipped {
            return format!("skipped: {reason}");
        }
        let verb = if self.dry_run { "would add" } else { "added" };
        let mut line = format!(
            "{verb} {}, {} {}",
            self.additions(),
            if self.dry_run { "would remove" } else { "removed" },
            self.removals()
        );
        if !self.failures.is_empty() {
            line.push_str(&format!(", {} failed", self.failures.len()));
        }
        line
    }

    pub(crate) fn fail(&mut self, user: Option<UserId>, role: Option<RoleId>, message: String) {
        self.failures.push(SyncFailure {
            user,
            role,
            message,
        });
    }

    fn count(&self, kind: OperationKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}
