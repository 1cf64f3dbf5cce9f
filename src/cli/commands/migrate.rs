//! Migrate command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::storage::{RunSummary, StepOutcome, migrate_store};
use colored::Colorize;

/// Bootstrap and migrate the store.
///
/// Exits successfully even when individual steps fail; they are listed in
/// the output and will be retried on the next run.
///
/// # Errors
///
/// Returns an error if the store is unreadable, the step plan is invalid,
/// or the store cannot be written.
pub fn execute(config: &Config, json: bool, quiet: bool) -> Result<()> {
    let summary = migrate_store(config)?;

    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else if !quiet {
        print_summary(config, &summary);
    }

    Ok(())
}

fn print_summary(config: &Config, summary: &RunSummary) {
    println!("Store: {}", config.store_path.display());
    match &summary.bootstrap.outcome {
        StepOutcome::Failed { error } => println!(
            "Bootstrap: {} ({}: {error})",
            summary.bootstrap.state.as_str(),
            "failed".red().bold()
        ),
        _ => println!(
            "Bootstrap: {} ({} projects imported)",
            summary.bootstrap.state.as_str(),
            summary.bootstrap.import.inserted
        ),
    }
    println!();

    for step in &summary.migration.steps {
        match &step.outcome {
            StepOutcome::Applied => println!("  {} {}", "applied  ".green(), step.name),
            StepOutcome::Unchanged => println!("  {} {}", "unchanged".dimmed(), step.name),
            StepOutcome::Failed { error } => {
                println!("  {} {}: {error}", "failed   ".red().bold(), step.name);
            }
        }
    }

    println!();
    let migration = &summary.migration;
    println!(
        "{} applied, {} unchanged, {} failed{}",
        migration.applied(),
        migration.unchanged(),
        migration.failed(),
        if summary.persisted {
            ""
        } else {
            " (store not rewritten)"
        }
    );
}
