//! Configuration management.
//!
//! This module resolves the two file locations Plansync works with and the
//! layout of the external ledger it reads from.
//!
//! # Architecture
//!
//! - **Local store**: the planning database owned by this process, by default
//!   at `<data dir>/plansync/planning.db`
//! - **External ledger**: the desktop finance application's database, opened
//!   read-only and never written
//!
//! A [`Config`] is resolved once at process start and then passed by
//! reference into every component. Nothing re-reads the environment later.

use crate::error::{Error, Result};
use crate::validate::validate_identifier;

use std::path::{Path, PathBuf};

/// Environment variable overriding the local store path.
pub const STORE_ENV: &str = "PLANSYNC_STORE";
/// Environment variable overriding the external ledger path.
pub const LEDGER_ENV: &str = "PLANSYNC_LEDGER";
/// Environment variable overriding the ledger's split table name.
pub const SPLIT_TABLE_ENV: &str = "PLANSYNC_LEDGER_SPLIT_TABLE";
/// Environment variable overriding the ledger's project column name.
pub const PROJECT_COLUMN_ENV: &str = "PLANSYNC_LEDGER_PROJECT_COLUMN";

const DEFAULT_SPLIT_TABLE: &str = "splits";
const DEFAULT_PROJECT_COLUMN: &str = "project";

/// Where project labels live inside the external ledger.
///
/// Both names end up in statement text (identifiers cannot be bound), so
/// they are validated on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLayout {
    split_table: String,
    project_column: String,
}

impl LedgerLayout {
    /// Build a layout from explicit names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if either name is not a plain SQL identifier.
    pub fn new(split_table: &str, project_column: &str) -> Result<Self> {
        validate_identifier(split_table)?;
        validate_identifier(project_column)?;
        Ok(Self {
            split_table: split_table.to_string(),
            project_column: project_column.to_string(),
        })
    }

    #[must_use]
    pub fn split_table(&self) -> &str {
        &self.split_table
    }

    #[must_use]
    pub fn project_column(&self) -> &str {
        &self.project_column
    }
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            split_table: DEFAULT_SPLIT_TABLE.to_string(),
            project_column: DEFAULT_PROJECT_COLUMN.to_string(),
        }
    }
}

/// Process-wide configuration, immutable once resolved.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the local planning store.
    pub store_path: PathBuf,
    /// Path of the external ledger. May not exist.
    pub ledger_path: PathBuf,
    /// Table/column layout of the external ledger.
    pub ledger: LedgerLayout,
}

impl Config {
    /// Build a config from explicit values, bypassing the environment.
    #[must_use]
    pub fn new(store_path: PathBuf, ledger_path: PathBuf) -> Self {
        Self {
            store_path,
            ledger_path,
            ledger: LedgerLayout::default(),
        }
    }

    /// Replace the ledger layout.
    #[must_use]
    pub fn with_ledger_layout(mut self, ledger: LedgerLayout) -> Self {
        self.ledger = ledger;
        self
    }

    /// Resolve the configuration for this process.
    ///
    /// Priority for each path:
    /// 1. Explicit value (CLI flag)
    /// 2. Environment variable (`PLANSYNC_STORE`, `PLANSYNC_LEDGER`)
    /// 3. Platform data directory
    ///
    /// # Errors
    ///
    /// Returns `Config` if no location can be determined, or
    /// `InvalidIdentifier` if the ledger layout overrides are malformed.
    pub fn resolve(explicit_store: Option<&Path>, explicit_ledger: Option<&Path>) -> Result<Self> {
        let store_path = resolve_path(explicit_store, STORE_ENV, "planning.db").ok_or_else(|| {
            Error::Config("Could not determine a location for the planning store".to_string())
        })?;
        let ledger_path = resolve_path(explicit_ledger, LEDGER_ENV, "ledger.db").ok_or_else(|| {
            Error::Config("Could not determine a location for the external ledger".to_string())
        })?;

        let split_table = env_non_empty(SPLIT_TABLE_ENV);
        let project_column = env_non_empty(PROJECT_COLUMN_ENV);
        let ledger = LedgerLayout::new(
            split_table.as_deref().unwrap_or(DEFAULT_SPLIT_TABLE),
            project_column.as_deref().unwrap_or(DEFAULT_PROJECT_COLUMN),
        )?;

        Ok(Self {
            store_path,
            ledger_path,
            ledger,
        })
    }
}

/// Get the platform data directory for Plansync.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "plansync").map(|d| d.data_dir().to_path_buf())
}

fn resolve_path(explicit: Option<&Path>, env_var: &str, file_name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_non_empty(env_var) {
        return Some(PathBuf::from(path));
    }

    data_dir().map(|dir| dir.join(file_name))
}

fn env_non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
