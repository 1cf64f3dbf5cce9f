//! Bootstrap command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::storage::{Bootstrapper, LocalStore, StepOutcome};
use serde::Serialize;

#[derive(Serialize)]
struct BootstrapOutput {
    state: &'static str,
    processed: usize,
    inserted: usize,
    persisted: bool,
    #[serde(flatten)]
    outcome: StepOutcome,
}

/// Seed a missing or empty store from the ledger.
///
/// # Errors
///
/// Returns an error if the store is unreadable or cannot be written.
pub fn execute(config: &Config, json: bool, quiet: bool) -> Result<()> {
    let (report, persisted) = LocalStore::scoped(&config.store_path, |store| {
        let report = Bootstrapper::new(config).run(store)?;
        let persisted = store.persist()?;
        Ok((report, persisted))
    })?;

    let output = BootstrapOutput {
        state: report.state.as_str(),
        processed: report.import.processed,
        inserted: report.import.inserted,
        persisted,
        outcome: report.outcome,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else if !quiet {
        println!("Store was {}.", output.state);
        if let StepOutcome::Failed { error } = &output.outcome {
            println!("Bootstrap failed: {error}");
        } else if output.inserted > 0 {
            println!("Imported {} projects from the ledger.", output.inserted);
        } else {
            println!("Nothing to import.");
        }
    }

    Ok(())
}
