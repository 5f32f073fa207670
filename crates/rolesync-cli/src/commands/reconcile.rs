//! One-shot reconciliation sweep

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use rolesync_core::{
    Coordinator, MemoryDirectory, OperationKind, Settings, SyncOptions, SyncRegistry, SyncReport,
};

use crate::error::{CliError, Result};

/// Run the reconcile command
///
/// Saves the snapshot afterwards unless `dry_run` is set. Fails when the sweep
/// was skipped or any change could not be applied.
pub fn run_reconcile(settings: &Settings, snapshot: &Path, dry_run: bool, json: bool) -> Result<()> {
    let directory = Arc::new(MemoryDirectory::load(snapshot)?);
    let registry = SyncRegistry::load(&settings.registry.path);
    let coordinator = Coordinator::new(directory.clone(), registry, settings);

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(coordinator.reconcile(&SyncOptions { dry_run }));

    if !dry_run {
        directory.save(snapshot)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "reconciliation incomplete: {}",
            report.summary()
        )))
    }
}

fn print_report(report: &SyncReport) {
    if let Some(reason) = &report.skipped {
        println!("{} Skipped: {}", "!!".yellow().bold(), reason);
        return;
    }

    let header = if report.dry_run {
        "Planned changes"
    } else {
        "Applied changes"
    };
    println!("{} {}", "=>".blue().bold(), header);

    for change in &report.changes {
        let marker = match change.kind {
            OperationKind::Add => "+".green().bold(),
            OperationKind::Remove => "-".red().bold(),
        };
        println!(
            "   {} {} ({}) {}",
            marker,
            change.role_name.cyan(),
            change.secondary_role,
            change.member
        );
    }

    for failure in &report.failures {
        eprintln!("{} {}", "error:".red().bold(), failure.message);
    }

    let status = if report.is_success() {
        "OK".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!("{} {}", status, report.summary());
}
