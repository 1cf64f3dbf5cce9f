//! Row-level operations on the planning store.
//!
//! All free-text values (project names, reasons) are bound as parameters.

use crate::error::Result;
use crate::model::project::new_project_id;
use crate::model::{AccountPreference, Project, SavingGoal};
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

const PROJECT_COLUMNS: &str =
    "id, name, start_date, end_date, planned_total, COALESCE(archived, 0), created_at";

/// Insert a project by name unless one with that exact name exists.
///
/// Never touches an existing row. Returns whether a row was inserted.
///
/// # Errors
///
/// Returns an error if the insert fails for any reason other than the
/// name already existing.
pub fn insert_project_if_absent(conn: &Connection, name: &str, now: i64) -> Result<bool> {
    let affected = conn.execute(
        "INSERT INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO NOTHING",
        rusqlite::params![new_project_id(), name, now],
    )?;
    Ok(affected > 0)
}

/// Insert a fully specified project (operator-created or test fixture).
///
/// # Errors
///
/// Returns an error if the name already exists or the insert fails.
pub fn insert_project(conn: &Connection, project: &Project) -> Result<()> {
    conn.execute(
        "INSERT INTO projects (id, name, start_date, end_date, planned_total, archived, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            project.id,
            project.name,
            project.start_date,
            project.end_date,
            project.planned_total,
            project.archived,
            project.created_at,
        ],
    )?;
    Ok(())
}

/// Get a project by its display name.
///
/// Requires the fully migrated `projects` shape.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_project_by_name(conn: &Connection, name: &str) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1"),
            [name],
            map_project_row,
        )
        .optional()?;
    Ok(project)
}

/// List all projects ordered by name.
///
/// Requires the fully migrated `projects` shape. A row holding a value of
/// the wrong type (text in `planned_total`, say) is skipped with a warning.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare(&format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name"))?;
    let mut rows = stmt.query([])?;
    let mut projects = Vec::new();

    while let Some(row) = rows.next()? {
        match map_project_row(row) {
            Ok(project) => projects.push(project),
            Err(
                e @ (rusqlite::Error::InvalidColumnType(..)
                | rusqlite::Error::FromSqlConversionFailure(..)
                | rusqlite::Error::IntegralValueOutOfRange(..)),
            ) => {
                let id = row.get::<_, String>(0).ok();
                warn!(project = ?id, error = %e, "Skipping unreadable project row");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(projects)
}

/// List project names only. Works on the bootstrap shape as well.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_project_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM projects ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}

/// Insert a saving goal.
///
/// # Errors
///
/// Returns an error if a constraint fails (negative amount, inverted range,
/// unknown project).
pub fn insert_saving_goal(
    conn: &Connection,
    project_id: &str,
    amount: f64,
    start_month: &str,
    end_month: Option<&str>,
    reason: &str,
    now: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO saving_goals (project_id, amount, start_month, end_month, created_at, reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![project_id, amount, start_month, end_month, now, reason],
    )?;
    Ok(conn.last_insert_rowid())
}

/// List all saving goals, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_saving_goals(conn: &Connection) -> Result<Vec<SavingGoal>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, amount, start_month, end_month, created_at, reason
         FROM saving_goals
         ORDER BY id",
    )?;
    let goals = stmt
        .query_map([], map_saving_goal_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(goals)
}

/// List account preferences in the current two-flag shape.
///
/// # Errors
///
/// Returns an error if the query fails (for example on a legacy table).
pub fn list_account_preferences(conn: &Connection) -> Result<Vec<AccountPreference>> {
    let mut stmt = conn.prepare(
        "SELECT account_id, account_name, include_savings, include_checking
         FROM account_preferences
         ORDER BY account_id",
    )?;
    let prefs = stmt
        .query_map([], |row| {
            Ok(AccountPreference {
                account_id: row.get(0)?,
                account_name: row.get(1)?,
                include_savings: row.get(2)?,
                include_checking: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(prefs)
}

// Helper to map project rows
fn map_project_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        planned_total: row.get(4)?,
        archived: row.get(5)?,
        created_at: row.get(6)?,
    })
}

// Helper to map saving goal rows
fn map_saving_goal_row(row: &rusqlite::Row) -> rusqlite::Result<SavingGoal> {
    Ok(SavingGoal {
        id: row.get(0)?,
        project_id: row.get(1)?,
        amount: row.get(2)?,
        start_month: row.get(3)?,
        end_month: row.get(4)?,
        created_at: row.get(5)?,
        reason: row.get(6)?,
    })
}
