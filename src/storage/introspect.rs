//! Schema introspection.
//!
//! Read-only questions about the shape of a database: which tables,
//! columns and indexes exist, and how many rows a table holds. Migration
//! steps use these answers to decide whether they have work to do, so none
//! of them fails on a missing table.

use crate::error::Result;
use crate::validate::validate_identifier;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

/// Check if a table exists.
///
/// # Errors
///
/// Returns an error only if `sqlite_master` cannot be queried.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?
        .exists([table])?;
    Ok(exists)
}

/// Check if an index exists.
///
/// # Errors
///
/// Returns an error only if `sqlite_master` cannot be queried.
pub fn index_exists(conn: &Connection, index: &str) -> Result<bool> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1")?
        .exists([index])?;
    Ok(exists)
}

/// List the columns of a table in declaration order.
///
/// Returns an empty list for a missing table.
///
/// # Errors
///
/// Returns an error if the pragma cannot be evaluated.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(columns)
}

/// Check if a column exists in a table.
///
/// # Errors
///
/// Returns an error if the pragma cannot be evaluated.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2")?
        .exists([table, column])?;
    Ok(exists)
}

/// Count the rows of a table. A missing table counts as zero.
///
/// # Errors
///
/// Returns `InvalidIdentifier` for a table name that cannot be quoted
/// safely, or a database error if the count fails.
pub fn row_count(conn: &Connection, table: &str) -> Result<i64> {
    validate_identifier(table)?;
    if !table_exists(conn, table)? {
        return Ok(0);
    }
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

/// List user tables in name order.
///
/// # Errors
///
/// Returns an error if `sqlite_master` cannot be queried.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(tables)
}

/// Structural fingerprint of the schema.
///
/// Hashes, per table: every column (name, type, not-null, default, primary
/// key position), every index (uniqueness, origin, indexed columns; names
/// only for explicitly created indexes) and every foreign key. The stored
/// `CREATE` text is deliberately not part of the hash, because a table
/// rebuilt through a rename carries different text for the same structure.
///
/// # Errors
///
/// Returns an error if any pragma cannot be evaluated.
pub fn schema_fingerprint(conn: &Connection) -> Result<String> {
    let mut hasher = Sha256::new();

    for table in list_tables(conn)? {
        hasher.update(format!("table {table}\n").as_bytes());

        let mut columns = conn.prepare(
            "SELECT name, type, \"notnull\", COALESCE(dflt_value, ''), pk
             FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let rows = columns.query_map([&table], |row| {
            Ok(format!(
                "column {} {} {} {} {}\n",
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        for line in rows {
            hasher.update(line?.as_bytes());
        }

        let mut indexes = index_descriptions(conn, &table)?;
        indexes.sort();
        for line in indexes {
            hasher.update(line.as_bytes());
        }

        let mut fks = conn.prepare(
            "SELECT \"table\", \"from\", COALESCE(\"to\", '')
             FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
        )?;
        let rows = fks.query_map([&table], |row| {
            Ok(format!(
                "fk {} {} {}\n",
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for line in rows {
            hasher.update(line?.as_bytes());
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn index_descriptions(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut list = conn.prepare("SELECT name, \"unique\", origin FROM pragma_index_list(?1)")?;
    let indexes = list
        .query_map([table], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut info = conn.prepare("SELECT COALESCE(name, '') FROM pragma_index_info(?1) ORDER BY seqno")?;
    let mut lines = Vec::with_capacity(indexes.len());
    for (name, unique, origin) in indexes {
        let columns = info
            .query_map([&name], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .join(",");
        // Auto-index names follow the table's original name.
        let label = if origin == "c" { name.as_str() } else { "" };
        lines.push(format!("index {label} {unique} {origin} {columns}\n"));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE projects (id TEXT PRIMARY KEY, name TEXT NOT NULL UNIQUE, created_at INTEGER NOT NULL);
             INSERT INTO projects VALUES ('p1', 'Trip', 0), ('p2', 'Car', 0);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_table_exists() {
        let conn = setup();
        assert!(table_exists(&conn, "projects").unwrap());
        assert!(!table_exists(&conn, "saving_goals").unwrap());
    }

    #[test]
    fn test_columns() {
        let conn = setup();
        assert_eq!(
            table_columns(&conn, "projects").unwrap(),
            vec!["id", "name", "created_at"]
        );
        assert!(column_exists(&conn, "projects", "name").unwrap());
        assert!(!column_exists(&conn, "projects", "archived").unwrap());
        assert!(table_columns(&conn, "missing").unwrap().is_empty());
        assert!(!column_exists(&conn, "missing", "name").unwrap());
    }

    #[test]
    fn test_row_count() {
        let conn = setup();
        assert_eq!(row_count(&conn, "projects").unwrap(), 2);
        assert_eq!(row_count(&conn, "missing").unwrap(), 0);
        assert!(row_count(&conn, "projects; DROP TABLE projects").is_err());
    }

    #[test]
    fn test_fingerprint_ignores_create_text() {
        let a = Connection::open_in_memory().unwrap();
        a.execute_batch("CREATE TABLE prefs (id TEXT PRIMARY KEY, flag INTEGER NOT NULL DEFAULT 1)")
            .unwrap();

        let b = Connection::open_in_memory().unwrap();
        b.execute_batch(
            "CREATE TABLE prefs_new (id TEXT PRIMARY KEY, flag INTEGER NOT NULL DEFAULT 1);
             ALTER TABLE prefs_new RENAME TO prefs;",
        )
        .unwrap();

        assert_eq!(schema_fingerprint(&a).unwrap(), schema_fingerprint(&b).unwrap());
    }

    #[test]
    fn test_fingerprint_detects_new_column() {
        let conn = setup();
        let before = schema_fingerprint(&conn).unwrap();
        conn.execute_batch("ALTER TABLE projects ADD COLUMN archived INTEGER NOT NULL DEFAULT 0")
            .unwrap();
        assert_ne!(before, schema_fingerprint(&conn).unwrap());
    }
}
