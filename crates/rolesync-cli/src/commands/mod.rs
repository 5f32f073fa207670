//! Command implementations for rolesync-cli

pub mod reconcile;
pub mod roles;
pub mod run;

use std::path::Path;

use rolesync_core::Settings;

use crate::error::{CliError, Result};

pub use reconcile::run_reconcile;
pub use roles::{run_roles_add, run_roles_list, run_roles_remove};
pub use run::run_service;

/// Load settings, turning a missing file into a hint
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(CliError::user(format!(
            "configuration file {} not found (pass --config to use another file)",
            path.display()
        )));
    }
    Ok(Settings::load(path)?)
}
