//! Filesystem primitives for rolesync
//!
//! Provides atomic writes and format-agnostic loading/saving for the
//! small files the service persists: the synchronized role list,
//! configuration, and directory snapshots.

pub mod config;
pub mod error;
pub mod io;

pub use config::ConfigStore;
pub use error::{Error, Result};
