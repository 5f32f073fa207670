//! Sync list maintenance

use std::path::Path;

use colored::Colorize;
use rolesync_core::{MemoryDirectory, RoleId, Settings, SyncRegistry};

use crate::error::{CliError, Result};

/// Run the roles list command
pub fn run_roles_list(settings: &Settings) -> Result<()> {
    let registry = SyncRegistry::load(&settings.registry.path);

    if registry.is_empty() {
        println!("{} No synchronized roles.", "=>".blue().bold());
        return Ok(());
    }

    println!(
        "{} {} synchronized role(s):",
        "=>".blue().bold(),
        registry.len()
    );
    for role in registry.iter() {
        println!("   {}", role.to_string().cyan());
    }
    Ok(())
}

/// Run the roles add command
///
/// The role must exist in the snapshot's primary group.
pub fn run_roles_add(settings: &Settings, snapshot: &Path, role: RoleId) -> Result<()> {
    let directory = MemoryDirectory::load(snapshot)?.snapshot()?;
    let primary = settings.groups.primary;
    let known = directory
        .group(primary)
        .ok_or_else(|| CliError::user(format!("primary group {primary} is not in the snapshot")))?
        .role(role)
        .cloned()
        .ok_or_else(|| {
            CliError::user(format!("role {role} does not exist in the primary group"))
        })?;

    let mut registry = SyncRegistry::load(&settings.registry.path);
    if registry.add(role)? {
        println!(
            "{} Role {} ({}) added to the sync list.",
            "OK".green().bold(),
            known.name.cyan(),
            role
        );
    } else {
        println!(
            "{} Role {} is already in the sync list.",
            "OK".green().bold(),
            role.to_string().cyan()
        );
    }
    Ok(())
}

/// Run the roles remove command
pub fn run_roles_remove(settings: &Settings, role: RoleId) -> Result<()> {
    let mut registry = SyncRegistry::load(&settings.registry.path);
    if registry.remove(role)? {
        println!(
            "{} Role {} removed from the sync list.",
            "OK".green().bold(),
            role.to_string().cyan()
        );
        Ok(())
    } else {
        Err(CliError::user(format!("role {role} is not in the sync list")))
    }
}
