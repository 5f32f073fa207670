//! Role synchronization engine
//!
//! Keeps a set of synchronized roles consistent between a primary and a
//! secondary membership group that describe the same users under unrelated
//! role namespaces:
//!
//! - **Registry**: persisted set of primary role ids eligible for sync
//! - **Matcher**: name-based equivalence between the two namespaces
//! - **Reconciler**: full sweep converging the secondary toward the primary
//! - **EventHandler**: incremental update for one member's role change
//! - **ControlSurface**: operator commands
//!
//! # Architecture
//!
//! ```text
//!        WorkQueue ──> Worker
//!                        |
//!                   Coordinator ── SyncRegistry (rolesync-fs)
//!                    /   |    \
//!          Reconciler EventHandler ControlSurface
//!                    \   |    /
//!           RoleMatcher  GroupDirectory
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rolesync_core::{Coordinator, MemoryDirectory, Settings, SyncOptions, SyncRegistry};
//!
//! async fn sweep(settings: Settings, directory: Arc<MemoryDirectory>) {
//!     let registry = SyncRegistry::load(&settings.registry.path);
//!     let coordinator = Coordinator::new(directory, registry, &settings);
//!     let report = coordinator.reconcile(&SyncOptions::default()).await;
//!     println!("{}", report.summary());
//! }
//! ```

pub mod config;
pub mod control;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod matcher;
pub mod model;
pub mod registry;
pub mod sync;
pub mod worker;

pub use config::{DEFAULT_CONFIG_FILE, Settings};
pub use control::{Command, ControlSurface, Invocation, Response};
pub use coordinator::Coordinator;
pub use directory::{
    DirectorySnapshot, GroupDirectory, GroupSnapshot, MemoryDirectory, Operation, OperationKind,
};
pub use error::{Error, Result};
pub use matcher::{ContainmentMatcher, RoleMatcher};
pub use model::{GroupId, GroupInfo, GroupPair, Member, MemberUpdate, Role, RoleId, UserId};
pub use registry::SyncRegistry;
pub use sync::{
    EventHandler, Reconciler, RoleChange, RoleDelta, SyncFailure, SyncOptions, SyncReport,
};
pub use worker::{Job, WorkQueue, Worker, WorkerStats, work_queue};
