//! Whole-file local store.
//!
//! The planning store is loaded wholesale from its backing file into an
//! in-memory SQLite connection, mutated there, and written back wholesale
//! through an atomic replace. There is no partial or streaming write.
//!
//! A single process is assumed to own the file for the duration of a run.

use crate::error::{Error, Result};
use crate::sync::file::atomic_replace;
use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The local planning store, held in memory.
#[derive(Debug)]
pub struct LocalStore {
    conn: Connection,
    path: PathBuf,
    existed: bool,
    dirty: bool,
}

impl LocalStore {
    /// Load the store from `path`.
    ///
    /// A missing file yields an empty in-memory store; nothing is written
    /// until [`persist`](Self::persist) is called on a dirty store.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnreadable` if the file exists but is not a readable
    /// SQLite database. This is the one fatal condition of a run.
    pub fn load(path: &Path) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        let existed = path.exists();

        if existed {
            let unreadable = |e: rusqlite::Error| Error::StoreUnreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            };
            conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)
                .map_err(unreadable)?;
            conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(unreadable)?;
            debug!(path = %path.display(), "Loaded planning store");
        } else {
            debug!(path = %path.display(), "Planning store missing, starting empty");
        }

        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            existed,
            dirty: false,
        })
    }

    /// Open an in-memory store with no backing file (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn,
            path: PathBuf::new(),
            existed: false,
            dirty: false,
        })
    }

    /// Load, run `f`, and persist on every exit path.
    ///
    /// Changes made before an error in `f` are still written, because each
    /// migration step is self-contained and forward progress is preferred
    /// over all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns the error from loading, from `f`, or from persisting, in
    /// that order of precedence.
    pub fn scoped<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut LocalStore) -> Result<T>,
    {
        let mut store = Self::load(path)?;
        let result = f(&mut store);
        let persisted = store.persist();

        match (result, persisted) {
            (Ok(value), Ok(_)) => Ok(value),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(persist_err)) => {
                warn!(error = %persist_err, "Failed to persist planning store after error");
                Err(e)
            }
        }
    }

    /// Write the store back to its file if anything changed.
    ///
    /// Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup or the atomic rename fails. The
    /// previous file content is left untouched in that case.
    pub fn persist(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        if self.path.as_os_str().is_empty() {
            self.dirty = false;
            return Ok(false);
        }

        atomic_replace(&self.path, |temp| {
            self.conn.backup(DatabaseName::Main, temp, None)?;
            Ok(())
        })?;

        info!(path = %self.path.display(), "Persisted planning store");
        self.existed = true;
        self.dirty = false;
        Ok(true)
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get a mutable reference to the connection (for transactions).
    ///
    /// Callers that write must also call [`mark_dirty`](Self::mark_dirty).
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Record that the in-memory content differs from the file.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the backing file existed when the store was loaded (or has
    /// been persisted since).
    #[must_use]
    pub fn existed(&self) -> bool {
        self.existed
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_not_created_without_changes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("planning.db");

        let mut store = LocalStore::load(&path).unwrap();
        assert!(!store.existed());
        assert!(!store.persist().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("planning.db");

        LocalStore::scoped(&path, |store| {
            store
                .conn()
                .execute_batch("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('kept');")?;
            store.mark_dirty();
            Ok(())
        })
        .unwrap();

        let store = LocalStore::load(&path).unwrap();
        assert!(store.existed());
        let v: String = store
            .conn()
            .query_row("SELECT v FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(v, "kept");
    }

    #[test]
    fn test_scoped_persists_progress_before_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("planning.db");

        let result: Result<()> = LocalStore::scoped(&path, |store| {
            store.conn().execute_batch("CREATE TABLE t (v TEXT)")?;
            store.mark_dirty();
            Err(Error::Other("later step failed".to_string()))
        });
        assert!(result.is_err());

        let store = LocalStore::load(&path).unwrap();
        assert!(crate::storage::introspect::table_exists(store.conn(), "t").unwrap());
    }

    #[test]
    fn test_unchanged_store_is_not_rewritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("planning.db");

        LocalStore::scoped(&path, |store| {
            store.conn().execute_batch("CREATE TABLE t (v TEXT)")?;
            store.mark_dirty();
            Ok(())
        })
        .unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();
        let bytes = fs::read(&path).unwrap();

        let wrote = LocalStore::scoped(&path, |store| store.persist()).unwrap();
        assert!(!wrote);
        assert_eq!(fs::read(&path).unwrap(), bytes);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("planning.db");
        fs::write(&path, vec![b'x'; 4096]).unwrap();

        let err = LocalStore::load(&path).unwrap_err();
        assert!(matches!(err, Error::StoreUnreadable { .. }));
    }
}
