//! rolesync CLI
//!
//! Command-line front end for the role synchronization engine.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands, RolesAction};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("{} role synchronization service", "rolesync".green().bold());
        println!();
        println!("Run {} for available commands.", "rolesync --help".cyan());
        return Ok(());
    };

    let settings = commands::load_settings(&cli.config)?;
    logging::init(&settings.logging, cli.verbose)?;
    tracing::debug!(config = %cli.config.display(), "settings loaded");

    match command {
        Commands::Run => commands::run_service(&settings, &cli.directory),
        Commands::Reconcile { dry_run, json } => {
            commands::run_reconcile(&settings, &cli.directory, dry_run, json)
        }
        Commands::Roles { action } => match action {
            RolesAction::List => commands::run_roles_list(&settings),
            RolesAction::Add { role } => commands::run_roles_add(&settings, &cli.directory, role),
            RolesAction::Remove { role } => commands::run_roles_remove(&settings, role),
        },
    }
}
