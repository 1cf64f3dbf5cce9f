//! Database schema definitions.
//!
//! Every table is declared here exactly once. Tables are only ever added by
//! the migration steps in [`super::migrations`]; nothing in this module runs
//! on its own.
//!
//! Note: Timestamps are stored as INTEGER (Unix milliseconds). Months are
//! stored as `YYYY-MM-01` text.

/// Projects as created by the bootstrapper.
///
/// Later columns (`start_date`, `end_date`, `planned_total`, `archived`) are
/// added by additive column steps so that every store reaches the same
/// shape through the same path. `created_at` carries a default so that stores
/// predating it can gain it through a column step with the same definition.
pub const PROJECTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL DEFAULT 0
);
";

/// Definition of `projects.created_at`, shared by the table and its column step.
pub const PROJECT_CREATED_AT_DEFINITION: &str = "INTEGER NOT NULL DEFAULT 0";

/// Columns added to `projects` after bootstrap: `(column, definition)`.
pub const PROJECT_COLUMNS: &[(&str, &str)] = &[
    ("start_date", "TEXT"),
    ("end_date", "TEXT"),
    ("planned_total", "REAL"),
    ("archived", "INTEGER NOT NULL DEFAULT 0"),
];

/// Generic key/value settings.
pub const SETTINGS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT,
    updated_at INTEGER NOT NULL DEFAULT 0
);
";

/// Computed total savings per month, cached from the ledger.
pub const SAVINGS_AMOUNTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS savings_amounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    month TEXT NOT NULL UNIQUE,
    amount REAL NOT NULL DEFAULT 0,
    computed_at INTEGER NOT NULL
);
";

/// Manually entered savings, one row per month.
pub const MONTHLY_MANUAL_SAVINGS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS monthly_manual_savings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    month TEXT NOT NULL UNIQUE,
    amount REAL NOT NULL DEFAULT 0,
    note TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
";

/// Planning transactions booked against a project.
pub const TRANSACTIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT REFERENCES projects(id),
    month TEXT NOT NULL,
    amount REAL NOT NULL,
    description TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
";

pub const TRANSACTIONS_PROJECT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_transactions_project ON transactions(project_id)";
pub const TRANSACTIONS_MONTH_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_transactions_month ON transactions(month)";

/// Monthly allocation per project, one row per (month, project).
pub const PROJECT_ALLOCATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS project_allocations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL REFERENCES projects(id),
    month TEXT NOT NULL,
    amount REAL NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE(month, project_id)
);
";

pub const PROJECT_ALLOCATIONS_PROJECT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_project_allocations_project ON project_allocations(project_id)";

/// Saving goals with temporal validity.
pub const SAVING_GOALS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS saving_goals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL REFERENCES projects(id),
    amount REAL NOT NULL CHECK (amount >= 0),
    start_month TEXT NOT NULL,
    end_month TEXT,
    created_at INTEGER NOT NULL,
    reason TEXT NOT NULL DEFAULT '',
    CHECK (end_month IS NULL OR start_month <= end_month)
);
";

pub const SAVING_GOALS_PROJECT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_saving_goals_project ON saving_goals(project_id, start_month)";

/// Column list of the current `account_preferences` shape.
const ACCOUNT_PREFERENCES_COLUMNS: &str = "(
    account_id TEXT PRIMARY KEY,
    account_name TEXT,
    include_savings INTEGER NOT NULL DEFAULT 1,
    include_checking INTEGER NOT NULL DEFAULT 1
)";

/// `CREATE TABLE` for the current `account_preferences` shape under `table`.
///
/// Used both for fresh stores and for the shadow table that replaces a
/// legacy table. `table` must be a constant from this crate.
#[must_use]
pub fn account_preferences_ddl(table: &str) -> String {
    format!("CREATE TABLE {table} {ACCOUNT_PREFERENCES_COLUMNS}")
}

/// The shape older stores used: a single flag meaning "exclude from both".
pub const LEGACY_ACCOUNT_PREFERENCES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS account_preferences (
    account_id TEXT PRIMARY KEY,
    account_name TEXT,
    excluded INTEGER NOT NULL DEFAULT 0
);
";
