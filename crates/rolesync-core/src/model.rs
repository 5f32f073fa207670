//! Identifiers and group-scoped snapshots
//!
//! Identifiers are opaque 64-bit values. A [`RoleId`] is only meaningful
//! inside the group that issued it; members of different groups are joined
//! by their shared [`UserId`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric value
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|_| Error::InvalidInput {
                    message: format!("invalid {} id: {:?}", $label, s),
                })
            }
        }
    };
}

snowflake_id!(
    /// Role identifier, unique within one group's namespace
    RoleId,
    "role"
);
snowflake_id!(
    /// User identity shared across both groups
    UserId,
    "user"
);
snowflake_id!(
    /// Group identifier
    GroupId,
    "group"
);

/// Normalize a role display name for comparison: trimmed, lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A resolved group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: GroupId,
    pub name: String,
}

/// A role as listed by its group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Role {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: RoleId(id),
            name: name.into(),
        }
    }
}

/// A member of one group and the roles they hold there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: UserId,
    pub name: String,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
}

impl Member {
    pub fn new(user: u64, name: impl Into<String>) -> Self {
        Self {
            user: UserId(user),
            name: name.into(),
            roles: BTreeSet::new(),
        }
    }

    /// Builder-style helper to attach raw role ids
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = u64>) -> Self {
        self.roles.extend(roles.into_iter().map(RoleId));
        self
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// A role-set change observed on one member of one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUpdate {
    pub group: GroupId,
    pub before: Member,
    pub after: Member,
}

/// The two groups kept in sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPair {
    /// Source of truth
    pub primary: GroupId,
    /// Corrected to match the primary
    pub secondary: GroupId,
}
