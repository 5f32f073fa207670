//! Shared test fixtures for the rolesync workspace.
//!
//! This crate is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fleet`]: a canned two-group directory with overlapping members
//! - [`world`]: [`TestWorld`] bundling a directory, a registry on disk, and
//!   settings in a temporary directory

pub mod fleet;
pub mod world;

pub use world::TestWorld;
