//! First-run population of the planning store.
//!
//! A store that is missing, or that has no projects yet, is seeded with
//! the base tables and every project the external ledger knows about. A
//! populated store is left alone; keeping it in step with the ledger is the
//! job of the regular `sync:projects` migration step.

use crate::config::Config;
use crate::error::Result;
use crate::storage::introspect::{row_count, table_exists};
use crate::storage::migrations::StepOutcome;
use crate::storage::schema::{PROJECTS_TABLE, SETTINGS_TABLE};
use crate::storage::store::LocalStore;
use crate::sync::import::{ImportStats, ProjectImporter, open_ledger};
use crate::sync::ledger::LabelSource;
use serde::Serialize;
use tracing::{info, warn};

/// What the bootstrapper found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    /// No store file on disk.
    Missing,
    /// A store file without projects.
    Empty,
    /// At least one project exists.
    Populated,
}

impl StoreState {
    /// Inspect a loaded store.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be read.
    pub fn detect(store: &LocalStore) -> Result<Self> {
        if !store.existed() {
            return Ok(Self::Missing);
        }
        if row_count(store.conn(), "projects")? == 0 {
            return Ok(Self::Empty);
        }
        Ok(Self::Populated)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Empty => "empty",
            Self::Populated => "populated",
        }
    }
}

/// What a bootstrap did.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub state: StoreState,
    pub import: ImportStats,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Seeds missing or empty stores.
pub struct Bootstrapper<'a> {
    config: &'a Config,
}

impl<'a> Bootstrapper<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Seed the store if it is missing or empty.
    ///
    /// Marks the store dirty when anything was created. Does not persist.
    /// A failure while seeding is rolled back and reported as a failed
    /// outcome, so the migration steps that follow still run.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store's state cannot be determined.
    pub fn run(&self, store: &mut LocalStore) -> Result<BootstrapReport> {
        let state = StoreState::detect(store)?;
        if state == StoreState::Populated {
            return Ok(BootstrapReport {
                state,
                import: ImportStats::default(),
                outcome: StepOutcome::Unchanged,
            });
        }

        match self.seed(store) {
            Ok((created, import)) => {
                let changed = created || import.changed();
                if changed {
                    store.mark_dirty();
                }
                info!(
                    state = state.as_str(),
                    imported = import.inserted,
                    "Bootstrapped planning store"
                );
                Ok(BootstrapReport {
                    state,
                    import,
                    outcome: if changed {
                        StepOutcome::Applied
                    } else {
                        StepOutcome::Unchanged
                    },
                })
            }
            Err(e) => {
                warn!(state = state.as_str(), error = %e, "Bootstrap failed, continuing");
                Ok(BootstrapReport {
                    state,
                    import: ImportStats::default(),
                    outcome: StepOutcome::Failed {
                        error: e.to_string(),
                    },
                })
            }
        }
    }

    // Base tables and the first import, in one transaction.
    fn seed(&self, store: &mut LocalStore) -> Result<(bool, ImportStats)> {
        let ledger = open_ledger(self.config)?;
        let tx = store.conn_mut().transaction()?;

        let mut created = false;
        for (table, ddl) in [("projects", PROJECTS_TABLE), ("settings", SETTINGS_TABLE)] {
            if !table_exists(&tx, table)? {
                tx.execute_batch(ddl)?;
                created = true;
            }
        }
        let import = ProjectImporter::new(&tx)
            .import_tolerant(ledger.as_ref().map(|l| l as &dyn LabelSource))?;
        tx.commit()?;

        Ok((created, import))
    }
}
