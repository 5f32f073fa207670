//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rolesync_core::{DEFAULT_CONFIG_FILE, RoleId};

/// rolesync - Keep roles consistent between two membership groups
#[derive(Parser, Debug)]
#[command(name = "rolesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "ROLESYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory snapshot file standing in for the live groups
    #[arg(short, long, global = true, default_value = "directory.json")]
    pub directory: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the service, reading JSON-lines requests from stdin
    ///
    /// Each line is either a command invocation or an external role change:
    ///
    ///   {"type":"command","caller":1,"is_admin":true,"name":"sync","args":["now"]}
    ///   {"type":"set_roles","group":607066249381543946,"user":100,"roles":[10]}
    ///
    /// Command responses are written to stdout, one JSON object per line.
    Run,

    /// Run one full reconciliation sweep
    Reconcile {
        /// Report planned changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Manage the synchronized role list
    Roles {
        #[command(subcommand)]
        action: RolesAction,
    },
}

/// Sync list actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RolesAction {
    /// List synchronized role ids
    List,

    /// Add a primary-group role to the sync list
    Add {
        /// Role id in the primary group
        role: RoleId,
    },

    /// Remove a role from the sync list
    Remove {
        /// Role id to remove
        role: RoleId,
    },
}
