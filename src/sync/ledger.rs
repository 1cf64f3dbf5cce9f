//! Read-only access to the external ledger.
//!
//! The ledger belongs to another application. It is opened with
//! `SQLITE_OPEN_READ_ONLY` and only ever queried for the distinct project
//! labels attached to its split records.

use crate::config::LedgerLayout;
use crate::error::{Error, Result};
use crate::storage::introspect::{column_exists, table_exists};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, warn};

/// Anything that can list raw project labels.
///
/// Labels come back as stored: untrimmed, possibly duplicated. The importer
/// normalizes them.
pub trait LabelSource {
    /// Return every raw project label.
    ///
    /// # Errors
    ///
    /// Returns `LedgerSchema` if the source does not have the expected shape.
    fn project_labels(&self) -> Result<Vec<String>>;
}

/// An open external ledger.
#[derive(Debug)]
pub struct Ledger {
    conn: Connection,
    layout: LedgerLayout,
}

impl Ledger {
    /// Open the ledger at `path` read-only.
    ///
    /// Returns `Ok(None)` when the file does not exist; a missing ledger is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns `LedgerSchema` if the file exists but cannot be opened.
    pub fn open(path: &Path, layout: &LedgerLayout) -> Result<Option<Self>> {
        if !path.exists() {
            debug!(path = %path.display(), "External ledger not found");
            return Ok(None);
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::LedgerSchema(format!("cannot open {}: {e}", path.display())))?;

        Ok(Some(Self {
            conn,
            layout: layout.clone(),
        }))
    }

    /// Wrap an already open connection (for testing).
    #[must_use]
    pub fn from_connection(conn: Connection, layout: LedgerLayout) -> Self {
        Self { conn, layout }
    }

    fn check_layout(&self) -> Result<()> {
        let table = self.layout.split_table();
        let column = self.layout.project_column();

        if !table_exists(&self.conn, table).map_err(ledger_error)? {
            return Err(Error::LedgerSchema(format!("table '{table}' not found")));
        }
        if !column_exists(&self.conn, table, column).map_err(ledger_error)? {
            return Err(Error::LedgerSchema(format!(
                "column '{column}' not found on '{table}'"
            )));
        }
        Ok(())
    }
}

impl LabelSource for Ledger {
    fn project_labels(&self) -> Result<Vec<String>> {
        self.check_layout()?;

        let table = self.layout.split_table();
        let column = self.layout.project_column();
        // Both identifiers were validated when the layout was built.
        let sql = format!(
            "SELECT DISTINCT {column} FROM {table}
             WHERE {column} IS NOT NULL AND TRIM({column}) <> ''"
        );

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::LedgerSchema(e.to_string()))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| Error::LedgerSchema(e.to_string()))?;

        let mut labels = Vec::new();
        let mut skipped = 0usize;
        while let Some(row) = rows.next().map_err(|e| Error::LedgerSchema(e.to_string()))? {
            let value = row
                .get_ref(0)
                .map_err(|e| Error::LedgerSchema(e.to_string()))?;
            match value {
                ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                    Ok(label) => labels.push(label.to_string()),
                    Err(_) => skipped += 1,
                },
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "Ignored project labels that are not text");
        }
        debug!(count = labels.len(), "Read project labels from ledger");
        Ok(labels)
    }
}

fn ledger_error(e: Error) -> Error {
    match e {
        Error::LedgerSchema(_) => e,
        other => Error::LedgerSchema(other.to_string()),
    }
}

/// Fixed label lists, for callers that already hold the labels.
impl<S: AsRef<str>> LabelSource for Vec<S> {
    fn project_labels(&self) -> Result<Vec<String>> {
        Ok(self.iter().map(|s| s.as_ref().to_string()).collect())
    }
}
