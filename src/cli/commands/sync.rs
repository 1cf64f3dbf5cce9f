//! Sync command implementation.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::LocalStore;
use crate::storage::introspect::table_exists;
use crate::sync::{ImportStats, LabelSource, ProjectImporter, open_ledger};

/// Import new ledger projects into an already migrated store.
///
/// Unlike `migrate`, a ledger with the wrong shape is reported as an error
/// here, since importing is the whole point of the command.
///
/// # Errors
///
/// Returns `NotMigrated` if the store has no projects table, `LedgerSchema`
/// if the ledger cannot be read, or an error writing the store.
pub fn execute(config: &Config, json: bool, quiet: bool) -> Result<()> {
    if !config.store_path.exists() {
        return Err(Error::NotMigrated {
            path: config.store_path.clone(),
        });
    }

    let stats = LocalStore::scoped(&config.store_path, |store| {
        if !table_exists(store.conn(), "projects")? {
            return Err(Error::NotMigrated {
                path: config.store_path.clone(),
            });
        }

        let Some(ledger) = open_ledger(config)? else {
            return Ok(ImportStats::default());
        };

        let tx = store.conn_mut().transaction()?;
        let stats = ProjectImporter::new(&tx).import(&ledger as &dyn LabelSource)?;
        tx.commit()?;

        if stats.changed() {
            store.mark_dirty();
        }
        Ok(stats)
    })?;

    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else if !quiet {
        println!(
            "Processed {} labels: {} new projects, {} already present.",
            stats.processed, stats.inserted, stats.skipped_existing
        );
    }

    Ok(())
}
