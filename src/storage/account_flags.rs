//! Account preference flag migration.
//!
//! Older stores kept one `excluded` column on `account_preferences`. The
//! current shape has two independent flags, `include_savings` and
//! `include_checking`. The move happens in place, one state at a time:
//!
//! ```text
//! LegacyOnly ──add both flags + translate──▶ Transitional
//! Partial    ──add missing flag (included)──▶ Transitional
//! Transitional ──shadow table, copy, drop, rename──▶ Clean
//! Incomplete ──add missing flag──▶ Clean
//! ```
//!
//! SQLite cannot drop a column in place on every supported version, so the
//! legacy column is removed by rebuilding the table. Every state is decided
//! from the live schema, so an interrupted run resumes from wherever it
//! stopped.

use crate::error::{Error, Result};
use crate::storage::introspect::{table_columns, table_exists};
use crate::storage::schema::account_preferences_ddl;
use rusqlite::Connection;
use tracing::{debug, info};

const TABLE: &str = "account_preferences";
const SHADOW_TABLE: &str = "account_preferences_new";
const LEGACY_COLUMN: &str = "excluded";
const FLAG_COLUMNS: [&str; 2] = ["include_savings", "include_checking"];
const FLAG_DEFINITION: &str = "INTEGER NOT NULL DEFAULT 1";
const CURRENT_COLUMNS: [&str; 4] = [
    "account_id",
    "account_name",
    "include_savings",
    "include_checking",
];

/// Shape of the `account_preferences` table as found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagState {
    /// No table at all.
    Absent,
    /// Legacy column only.
    LegacyOnly,
    /// Legacy column and exactly one of the new flags.
    Partial,
    /// Legacy column and both new flags.
    Transitional,
    /// No legacy column, one new flag missing.
    Incomplete,
    /// No legacy column, both new flags.
    Clean,
}

/// Inspect the table and classify it.
///
/// # Errors
///
/// Returns an error if the schema cannot be read.
pub fn detect_flag_state(conn: &Connection) -> Result<FlagState> {
    if !table_exists(conn, TABLE)? {
        return Ok(FlagState::Absent);
    }

    let columns = table_columns(conn, TABLE)?;
    let has_legacy = columns.iter().any(|c| c == LEGACY_COLUMN);
    let flags = FLAG_COLUMNS
        .iter()
        .filter(|flag| columns.iter().any(|c| c == *flag))
        .count();

    Ok(match (has_legacy, flags) {
        (true, 0) => FlagState::LegacyOnly,
        (true, 1) => FlagState::Partial,
        (true, _) => FlagState::Transitional,
        (false, 2) => FlagState::Clean,
        (false, _) => FlagState::Incomplete,
    })
}

/// Bring `account_preferences` to the clean two-flag shape.
///
/// Walks the state machine until the table is clean. Returns whether
/// anything changed.
///
/// # Errors
///
/// Returns an error if a statement fails. Run inside a transaction so a
/// failure leaves the table as it was.
pub fn migrate_account_flags(conn: &Connection) -> Result<bool> {
    let mut changed = false;

    // Each transition moves strictly closer to Clean; three is the longest path.
    for _ in 0..4 {
        let state = detect_flag_state(conn)?;
        debug!(?state, "Account preference flags");

        match state {
            FlagState::Clean => return Ok(changed),
            FlagState::Absent => {
                conn.execute_batch(&account_preferences_ddl(TABLE))?;
                info!("Created account_preferences");
            }
            FlagState::LegacyOnly => {
                let added = add_missing_flags(conn)?;
                translate_legacy_flag(conn, &added)?;
                info!(columns = ?added, "Translated legacy excluded flag");
            }
            FlagState::Partial => {
                // Only the legacy-only state derives flags from `excluded`.
                let added = add_missing_flags(conn)?;
                info!(columns = ?added, "Added missing account preference flag");
            }
            FlagState::Transitional => {
                drop_legacy_column(conn)?;
                info!("Removed legacy excluded column from account_preferences");
            }
            FlagState::Incomplete => {
                let added = add_missing_flags(conn)?;
                info!(columns = ?added, "Added account preference flags");
            }
        }
        changed = true;
    }

    Err(Error::Other(
        "account_preferences did not reach a clean shape".to_string(),
    ))
}

/// Add whichever flag columns are missing, defaulting to included.
fn add_missing_flags(conn: &Connection) -> Result<Vec<&'static str>> {
    let columns = table_columns(conn, TABLE)?;
    let mut added = Vec::new();

    for flag in FLAG_COLUMNS {
        if !columns.iter().any(|c| c == flag) {
            conn.execute_batch(&format!(
                "ALTER TABLE {TABLE} ADD COLUMN {flag} {FLAG_DEFINITION}"
            ))?;
            added.push(flag);
        }
    }

    Ok(added)
}

/// Derive the given flag columns from the legacy column in one update.
///
/// A set `excluded` turns the flag off; anything else leaves it on.
fn translate_legacy_flag(conn: &Connection, flags: &[&str]) -> Result<()> {
    if flags.is_empty() {
        return Ok(());
    }

    let assignments = flags
        .iter()
        .map(|flag| {
            format!("{flag} = CASE WHEN COALESCE({LEGACY_COLUMN}, 0) <> 0 THEN 0 ELSE 1 END")
        })
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute(&format!("UPDATE {TABLE} SET {assignments}"), [])?;
    Ok(())
}

/// Rebuild the table without the legacy column.
///
/// Copies only the columns the old and new shapes share; anything the old
/// table lacks takes the new table's default.
fn drop_legacy_column(conn: &Connection) -> Result<()> {
    let existing = table_columns(conn, TABLE)?;
    let (targets, sources): (Vec<&str>, Vec<String>) = CURRENT_COLUMNS
        .into_iter()
        .filter(|column| existing.iter().any(|c| c == column))
        .map(|column| {
            let source = if FLAG_COLUMNS.contains(&column) {
                format!("COALESCE({column}, 1)")
            } else {
                column.to_string()
            };
            (column, source)
        })
        .unzip();

    conn.execute_batch(&format!("DROP TABLE IF EXISTS {SHADOW_TABLE}"))?;
    conn.execute_batch(&account_preferences_ddl(SHADOW_TABLE))?;
    conn.execute(
        &format!(
            "INSERT INTO {SHADOW_TABLE} ({}) SELECT {} FROM {TABLE}",
            targets.join(", "),
            sources.join(", ")
        ),
        [],
    )?;
    conn.execute_batch(&format!(
        "DROP TABLE {TABLE}; ALTER TABLE {SHADOW_TABLE} RENAME TO {TABLE};"
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccountPreference;
    use crate::storage::introspect::column_exists;
    use crate::storage::queries::list_account_preferences;
    use crate::storage::schema::LEGACY_ACCOUNT_PREFERENCES_TABLE;

    fn legacy_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_ACCOUNT_PREFERENCES_TABLE).unwrap();
        conn.execute_batch(
            "INSERT INTO account_preferences (account_id, account_name, excluded) VALUES
                ('acc_1', 'Checking', 1),
                ('acc_2', 'Savings', 0);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_legacy_flag_translates_to_both_flags() {
        let conn = legacy_conn();
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::LegacyOnly);

        assert!(migrate_account_flags(&conn).unwrap());

        let prefs = list_account_preferences(&conn).unwrap();
        assert_eq!(
            prefs,
            vec![
                AccountPreference::from_legacy("acc_1".to_string(), Some("Checking".to_string()), true),
                AccountPreference::from_legacy("acc_2".to_string(), Some("Savings".to_string()), false),
            ]
        );

        assert!(!column_exists(&conn, "account_preferences", "excluded").unwrap());
        assert!(!table_exists(&conn, SHADOW_TABLE).unwrap());
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::Clean);
    }

    #[test]
    fn test_partial_state_adds_missing_flag_as_included() {
        let conn = legacy_conn();
        conn.execute_batch(
            "ALTER TABLE account_preferences ADD COLUMN include_savings INTEGER NOT NULL DEFAULT 1;
             UPDATE account_preferences SET include_savings = 0 WHERE account_id = 'acc_1';",
        )
        .unwrap();
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::Partial);

        assert!(migrate_account_flags(&conn).unwrap());

        let prefs = list_account_preferences(&conn).unwrap();
        // acc_1 has excluded = 1, but the added flag still defaults to included.
        assert!(!prefs[0].include_savings);
        assert!(prefs[0].include_checking);
        assert!(prefs[1].include_savings);
        assert!(prefs[1].include_checking);
        assert!(!column_exists(&conn, "account_preferences", "excluded").unwrap());
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::Clean);
    }

    #[test]
    fn test_legacy_table_without_display_name() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE account_preferences (
                account_id TEXT PRIMARY KEY,
                excluded INTEGER NOT NULL DEFAULT 0
            );
            INSERT INTO account_preferences VALUES ('acc_1', 1), ('acc_2', 0);",
        )
        .unwrap();
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::LegacyOnly);

        assert!(migrate_account_flags(&conn).unwrap());

        let prefs = list_account_preferences(&conn).unwrap();
        assert_eq!(
            prefs,
            vec![
                AccountPreference::from_legacy("acc_1".to_string(), None, true),
                AccountPreference::from_legacy("acc_2".to_string(), None, false),
            ]
        );
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::Clean);
    }

    #[test]
    fn test_transitional_state_resumes() {
        let conn = legacy_conn();
        conn.execute_batch(
            "ALTER TABLE account_preferences ADD COLUMN include_savings INTEGER NOT NULL DEFAULT 1;
             ALTER TABLE account_preferences ADD COLUMN include_checking INTEGER NOT NULL DEFAULT 1;
             UPDATE account_preferences SET include_savings = 0, include_checking = 1
                WHERE account_id = 'acc_1';
             CREATE TABLE account_preferences_new (leftover TEXT);",
        )
        .unwrap();
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::Transitional);

        assert!(migrate_account_flags(&conn).unwrap());

        let prefs = list_account_preferences(&conn).unwrap();
        assert!(!prefs[0].include_savings);
        assert!(prefs[0].include_checking);
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::Clean);
    }

    #[test]
    fn test_absent_table_is_created_clean() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::Absent);

        assert!(migrate_account_flags(&conn).unwrap());
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::Clean);
        assert!(list_account_preferences(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_clean_table_is_unchanged() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&account_preferences_ddl(TABLE)).unwrap();

        assert!(!migrate_account_flags(&conn).unwrap());
    }

    #[test]
    fn test_incomplete_table_gains_missing_flag() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE account_preferences (
                account_id TEXT PRIMARY KEY,
                account_name TEXT,
                include_savings INTEGER NOT NULL DEFAULT 1
            );
            INSERT INTO account_preferences VALUES ('acc_1', NULL, 0);",
        )
        .unwrap();
        assert_eq!(detect_flag_state(&conn).unwrap(), FlagState::Incomplete);

        assert!(migrate_account_flags(&conn).unwrap());

        let prefs = list_account_preferences(&conn).unwrap();
        assert!(!prefs[0].include_savings);
        assert!(prefs[0].include_checking);
    }
}
