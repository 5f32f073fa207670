//! Error types for rolesync-core

use crate::model::{GroupId, RoleId, UserId};

/// Result type for rolesync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rolesync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A call to the group directory failed
    #[error("Directory call {operation} failed: {message}")]
    Directory { operation: String, message: String },

    /// A configured group cannot be resolved
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// A member is not present in the group
    #[error("Member {user} not found in group {group}")]
    MemberNotFound { group: GroupId, user: UserId },

    /// A role is not present in the group
    #[error("Role {role} not found in group {group}")]
    RoleNotFound { group: GroupId, role: RoleId },

    /// Malformed input from the command surface
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Configuration failed validation
    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    /// The work queue has shut down
    #[error("Work queue is closed")]
    QueueClosed,

    /// Filesystem error from rolesync-fs
    #[error(transparent)]
    Fs(#[from] rolesync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn directory(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Directory {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}
