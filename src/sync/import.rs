//! Project import from the external ledger.
//!
//! Every distinct project label in the ledger becomes a local project,
//! unless a project with that exact name already exists. Existing projects
//! are never modified.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::queries::insert_project_if_absent;
use crate::sync::ledger::{LabelSource, Ledger};
use crate::validate::dedupe_labels;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Statistics from one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Distinct labels after normalization
    pub processed: usize,
    /// Projects newly created
    pub inserted: usize,
    /// Labels that already had a project
    pub skipped_existing: usize,
}

impl ImportStats {
    /// Whether the import created anything.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.inserted > 0
    }
}

/// Imports ledger labels into the local `projects` table.
pub struct ProjectImporter<'a> {
    conn: &'a Connection,
    now: i64,
}

impl<'a> ProjectImporter<'a> {
    /// Create an importer writing through `conn`.
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            now: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Import from any label source.
    ///
    /// # Errors
    ///
    /// Returns the source's error, or a database error if an insert fails.
    pub fn import(&self, source: &dyn LabelSource) -> Result<ImportStats> {
        let labels = dedupe_labels(source.project_labels()?);
        let mut stats = ImportStats {
            processed: labels.len(),
            ..ImportStats::default()
        };

        for label in &labels {
            if insert_project_if_absent(self.conn, label, self.now)? {
                debug!(project = %label, "Imported project");
                stats.inserted += 1;
            } else {
                stats.skipped_existing += 1;
            }
        }

        info!(
            processed = stats.processed,
            inserted = stats.inserted,
            skipped = stats.skipped_existing,
            "Project import complete"
        );
        Ok(stats)
    }

    /// Import from an optional source, absorbing ledger problems.
    ///
    /// A missing source or a ledger with the wrong shape yields empty
    /// statistics rather than an error, so the rest of a migration run can
    /// proceed.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing to the local store fails.
    pub fn import_tolerant(&self, source: Option<&dyn LabelSource>) -> Result<ImportStats> {
        let Some(source) = source else {
            debug!("No external ledger, skipping project import");
            return Ok(ImportStats::default());
        };

        match self.import(source) {
            Err(Error::LedgerSchema(message)) => {
                warn!(%message, "External ledger has an unexpected shape, skipping project import");
                Ok(ImportStats::default())
            }
            other => other,
        }
    }
}

/// Open the configured ledger, treating an unopenable file like a missing one.
///
/// # Errors
///
/// Returns an error only for failures unrelated to the ledger itself.
pub fn open_ledger(config: &Config) -> Result<Option<Ledger>> {
    match Ledger::open(&config.ledger_path, &config.ledger) {
        Err(Error::LedgerSchema(message)) => {
            warn!(%message, "Cannot open external ledger, skipping project import");
            Ok(None)
        }
        other => other,
    }
}

/// Open the configured ledger and import its projects.
///
/// Returns the number of distinct labels processed, which counts labels
/// that already had a project. A missing ledger yields 0.
///
/// # Errors
///
/// Returns an error only if writing to the local store fails.
pub fn import_projects_from(config: &Config, conn: &Connection) -> Result<usize> {
    let ledger = open_ledger(config)?;
    let stats = ProjectImporter::new(conn)
        .import_tolerant(ledger.as_ref().map(|l| l as &dyn LabelSource))?;
    Ok(stats.processed)
}
