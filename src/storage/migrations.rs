//! Schema migration steps and the orchestrator that runs them.
//!
//! A migration is an explicit list of named [`Step`]s. Each step declares
//! which schema objects it provides and which it requires, as `table` or
//! `table.column` keys. [`plan`] derives the execution order from those
//! declarations; declaration order only breaks ties.
//!
//! Steps are idempotent: each inspects the live schema and acts only when
//! its object is missing. There is no version table. Running the full list
//! on every startup is how a store at any intermediate shape converges.
//!
//! Every step runs in its own transaction. A failing step is rolled back,
//! logged and reported; the remaining steps still run.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::planning::backfill_initial_goals;
use crate::storage::account_flags::migrate_account_flags;
use crate::storage::bootstrap::{BootstrapReport, Bootstrapper};
use crate::storage::introspect::{column_exists, index_exists, table_exists};
use crate::storage::schema::{
    MONTHLY_MANUAL_SAVINGS_TABLE, PROJECT_ALLOCATIONS_PROJECT_INDEX, PROJECT_ALLOCATIONS_TABLE,
    PROJECT_CREATED_AT_DEFINITION, PROJECTS_TABLE, SAVING_GOALS_PROJECT_INDEX, SAVING_GOALS_TABLE, SAVINGS_AMOUNTS_TABLE,
    SETTINGS_TABLE, TRANSACTIONS_MONTH_INDEX, TRANSACTIONS_PROJECT_INDEX, TRANSACTIONS_TABLE,
};
use crate::storage::store::LocalStore;
use crate::sync::import::{ProjectImporter, open_ledger};
use crate::sync::ledger::LabelSource;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Signature of a step with custom logic.
///
/// Returns whether the step changed anything.
pub type CustomAction = fn(&Connection, &StepContext<'_>) -> Result<bool>;

/// What a step does when its object is missing.
#[derive(Clone, Copy)]
pub enum StepAction {
    /// Create `table` with `ddl` unless it exists.
    CreateTable {
        table: &'static str,
        ddl: &'static str,
    },
    /// Add `column` to `table` unless it exists.
    AddColumn {
        table: &'static str,
        column: &'static str,
        definition: &'static str,
    },
    /// Create index `name` with `ddl` unless it exists.
    CreateIndex {
        name: &'static str,
        ddl: &'static str,
    },
    /// Anything else. The function decides for itself whether to act.
    Custom(CustomAction),
}

impl std::fmt::Debug for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateTable { table, .. } => write!(f, "CreateTable({table})"),
            Self::AddColumn { table, column, .. } => write!(f, "AddColumn({table}.{column})"),
            Self::CreateIndex { name, .. } => write!(f, "CreateIndex({name})"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// A named, idempotent unit of migration.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: &'static str,
    /// Schema keys this step creates
    pub provides: &'static [&'static str],
    /// Schema keys that must exist before this step runs
    pub requires: &'static [&'static str],
    pub action: StepAction,
}

/// Inputs available to custom steps.
pub struct StepContext<'a> {
    pub config: &'a Config,
    /// Project labels, if an external ledger is available
    pub labels: Option<&'a dyn LabelSource>,
    /// Timestamp (Unix milliseconds) used for rows created during the run
    pub now: i64,
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Applied,
    Unchanged,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Outcome of a full orchestrator run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub steps: Vec<StepReport>,
}

impl MigrationReport {
    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Applied))
    }

    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Unchanged))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed { .. }))
    }

    /// Outcome of the step called `name`, if it ran.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.name == name).map(|s| &s.outcome)
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// The full list of steps a store goes through, in declaration order.
#[must_use]
pub fn default_steps() -> Vec<Step> {
    vec![
        Step {
            name: "table:projects",
            provides: &["projects"],
            requires: &[],
            action: StepAction::CreateTable {
                table: "projects",
                ddl: PROJECTS_TABLE,
            },
        },
        Step {
            name: "column:projects.created_at",
            provides: &["projects.created_at"],
            requires: &["projects"],
            action: StepAction::AddColumn {
                table: "projects",
                column: "created_at",
                definition: PROJECT_CREATED_AT_DEFINITION,
            },
        },
        Step {
            name: "column:projects.start_date",
            provides: &["projects.start_date"],
            requires: &["projects"],
            action: StepAction::AddColumn {
                table: "projects",
                column: "start_date",
                definition: "TEXT",
            },
        },
        Step {
            name: "column:projects.end_date",
            provides: &["projects.end_date"],
            requires: &["projects"],
            action: StepAction::AddColumn {
                table: "projects",
                column: "end_date",
                definition: "TEXT",
            },
        },
        Step {
            name: "column:projects.planned_total",
            provides: &["projects.planned_total"],
            requires: &["projects"],
            action: StepAction::AddColumn {
                table: "projects",
                column: "planned_total",
                definition: "REAL",
            },
        },
        Step {
            name: "column:projects.archived",
            provides: &["projects.archived"],
            requires: &["projects"],
            action: StepAction::AddColumn {
                table: "projects",
                column: "archived",
                definition: "INTEGER NOT NULL DEFAULT 0",
            },
        },
        Step {
            name: "sync:projects",
            provides: &[],
            requires: &["projects", "projects.created_at"],
            action: StepAction::Custom(sync_projects),
        },
        Step {
            name: "table:savings_amounts",
            provides: &["savings_amounts"],
            requires: &[],
            action: StepAction::CreateTable {
                table: "savings_amounts",
                ddl: SAVINGS_AMOUNTS_TABLE,
            },
        },
        Step {
            name: "table:monthly_manual_savings",
            provides: &["monthly_manual_savings"],
            requires: &[],
            action: StepAction::CreateTable {
                table: "monthly_manual_savings",
                ddl: MONTHLY_MANUAL_SAVINGS_TABLE,
            },
        },
        Step {
            name: "table:transactions",
            provides: &["transactions"],
            requires: &["projects"],
            action: StepAction::CreateTable {
                table: "transactions",
                ddl: TRANSACTIONS_TABLE,
            },
        },
        Step {
            name: "index:idx_transactions_project",
            provides: &[],
            requires: &["transactions"],
            action: StepAction::CreateIndex {
                name: "idx_transactions_project",
                ddl: TRANSACTIONS_PROJECT_INDEX,
            },
        },
        Step {
            name: "index:idx_transactions_month",
            provides: &[],
            requires: &["transactions"],
            action: StepAction::CreateIndex {
                name: "idx_transactions_month",
                ddl: TRANSACTIONS_MONTH_INDEX,
            },
        },
        Step {
            name: "table:project_allocations",
            provides: &["project_allocations"],
            requires: &["projects"],
            action: StepAction::CreateTable {
                table: "project_allocations",
                ddl: PROJECT_ALLOCATIONS_TABLE,
            },
        },
        Step {
            name: "index:idx_project_allocations_project",
            provides: &[],
            requires: &["project_allocations"],
            action: StepAction::CreateIndex {
                name: "idx_project_allocations_project",
                ddl: PROJECT_ALLOCATIONS_PROJECT_INDEX,
            },
        },
        Step {
            name: "table:saving_goals",
            provides: &["saving_goals"],
            requires: &[
                "projects",
                "projects.created_at",
                "projects.start_date",
                "projects.end_date",
                "projects.planned_total",
                "projects.archived",
            ],
            action: StepAction::Custom(create_saving_goals),
        },
        Step {
            name: "index:idx_saving_goals_project",
            provides: &[],
            requires: &["saving_goals"],
            action: StepAction::CreateIndex {
                name: "idx_saving_goals_project",
                ddl: SAVING_GOALS_PROJECT_INDEX,
            },
        },
        Step {
            name: "transform:account_preferences",
            provides: &["account_preferences"],
            requires: &[],
            action: StepAction::Custom(transform_account_preferences),
        },
        Step {
            name: "table:settings",
            provides: &["settings"],
            requires: &[],
            action: StepAction::CreateTable {
                table: "settings",
                ddl: SETTINGS_TABLE,
            },
        },
    ]
}

fn sync_projects(conn: &Connection, ctx: &StepContext<'_>) -> Result<bool> {
    let stats = ProjectImporter::new(conn).import_tolerant(ctx.labels)?;
    Ok(stats.changed())
}

// The backfill belongs to table creation: a store that already has the
// table never gets initial goals again.
fn create_saving_goals(conn: &Connection, ctx: &StepContext<'_>) -> Result<bool> {
    if table_exists(conn, "saving_goals")? {
        return Ok(false);
    }
    conn.execute_batch(SAVING_GOALS_TABLE)?;
    let goals = backfill_initial_goals(conn, ctx.now)?;
    info!(goals, "Created saving_goals with initial goals");
    Ok(true)
}

fn transform_account_preferences(conn: &Connection, _ctx: &StepContext<'_>) -> Result<bool> {
    migrate_account_flags(conn)
}

fn requirement_met(conn: &Connection, key: &str) -> Result<bool> {
    match key.split_once('.') {
        Some((table, column)) => column_exists(conn, table, column),
        None => table_exists(conn, key),
    }
}

/// Order `steps` so every requirement is provided before it is needed.
///
/// A requirement no step provides must already exist in `conn`. Among
/// steps that are ready at the same time, the one declared first runs
/// first, so an already consistent list keeps its order.
///
/// Returns indexes into `steps`.
///
/// # Errors
///
/// Returns `MissingDependency` for a requirement nobody provides and the
/// store lacks, or `DependencyCycle` if the declarations form a cycle.
pub fn plan(steps: &[Step], conn: &Connection) -> Result<Vec<usize>> {
    let mut providers: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, step) in steps.iter().enumerate() {
        for key in step.provides {
            providers.entry(*key).or_default().push(i);
        }
    }

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
    let mut pending = vec![0usize; steps.len()];

    for (i, step) in steps.iter().enumerate() {
        for key in step.requires {
            match providers.get(key) {
                Some(list) => {
                    for &p in list.iter().filter(|&&p| p != i) {
                        dependents[p].push(i);
                        pending[i] += 1;
                    }
                }
                None => {
                    if !requirement_met(conn, key)? {
                        return Err(Error::MissingDependency {
                            step: step.name.to_string(),
                            table: (*key).to_string(),
                        });
                    }
                }
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..steps.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(steps.len());

    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &d in &dependents[i] {
            pending[d] -= 1;
            if pending[d] == 0 {
                ready.insert(d);
            }
        }
    }

    if order.len() < steps.len() {
        let stuck = (0..steps.len())
            .filter(|i| pending[*i] > 0)
            .map(|i| steps[i].name.to_string())
            .collect();
        return Err(Error::DependencyCycle { steps: stuck });
    }

    Ok(order)
}

fn apply(conn: &Connection, step: &Step, ctx: &StepContext<'_>) -> Result<bool> {
    match step.action {
        StepAction::CreateTable { table, ddl } => {
            if table_exists(conn, table)? {
                return Ok(false);
            }
            conn.execute_batch(ddl)?;
            Ok(true)
        }
        StepAction::AddColumn {
            table,
            column,
            definition,
        } => {
            if column_exists(conn, table, column)? {
                return Ok(false);
            }
            conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"))?;
            Ok(true)
        }
        StepAction::CreateIndex { name, ddl } => {
            if index_exists(conn, name)? {
                return Ok(false);
            }
            conn.execute_batch(ddl)?;
            Ok(true)
        }
        StepAction::Custom(action) => action(conn, ctx),
    }
}

fn run_step(conn: &mut Connection, step: &Step, ctx: &StepContext<'_>) -> StepOutcome {
    let result = conn.transaction().map_err(Error::from).and_then(|tx| {
        let changed = apply(&tx, step, ctx)?;
        tx.commit()?;
        Ok(changed)
    });

    match result {
        Ok(true) => StepOutcome::Applied,
        Ok(false) => StepOutcome::Unchanged,
        Err(e) => StepOutcome::Failed {
            error: e.to_string(),
        },
    }
}

/// Runs a list of steps against a store.
pub struct Migrator<'a> {
    config: &'a Config,
    steps: Vec<Step>,
}

impl<'a> Migrator<'a> {
    /// A migrator with [`default_steps`].
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self::with_steps(config, default_steps())
    }

    #[must_use]
    pub fn with_steps(config: &'a Config, steps: Vec<Step>) -> Self {
        Self { config, steps }
    }

    /// Run every step once, in planned order.
    ///
    /// Marks the store dirty if any step applied. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error only if the plan itself is invalid. Individual step
    /// failures are reported in the [`MigrationReport`].
    pub fn run(&self, store: &mut LocalStore) -> Result<MigrationReport> {
        let order = plan(&self.steps, store.conn())?;
        let ledger = open_ledger(self.config)?;
        let ctx = StepContext {
            config: self.config,
            labels: ledger.as_ref().map(|l| l as &dyn LabelSource),
            now: chrono::Utc::now().timestamp_millis(),
        };

        let mut report = MigrationReport::default();
        for i in order {
            let step = &self.steps[i];
            let outcome = run_step(store.conn_mut(), step, &ctx);
            match &outcome {
                StepOutcome::Applied => {
                    info!(step = step.name, "Applied migration step");
                    store.mark_dirty();
                }
                StepOutcome::Unchanged => debug!(step = step.name, "Migration step unchanged"),
                StepOutcome::Failed { error } => {
                    warn!(step = step.name, %error, "Migration step failed, continuing");
                }
            }
            report.steps.push(StepReport {
                name: step.name.to_string(),
                outcome,
            });
        }

        Ok(report)
    }
}

/// Everything one startup run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub bootstrap: BootstrapReport,
    pub migration: MigrationReport,
    /// Whether the store file was written
    pub persisted: bool,
}

/// Bootstrap and migrate the configured store, persisting after each phase.
///
/// # Errors
///
/// Returns `StoreUnreadable` if the store file is corrupt, a plan error, or
/// an error persisting the store.
pub fn migrate_store(config: &Config) -> Result<RunSummary> {
    LocalStore::scoped(&config.store_path, |store| {
        // Seeding failures come back as a failed outcome, not an error.
        let bootstrap = Bootstrapper::new(config).run(store)?;
        let mut persisted = store.persist()?;

        let migration = Migrator::new(config).run(store)?;
        persisted |= store.persist()?;

        info!(
            applied = migration.applied(),
            failed = migration.failed(),
            persisted,
            "Migration run complete"
        );
        Ok(RunSummary {
            bootstrap,
            migration,
            persisted,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Project;
    use crate::storage::introspect::schema_fingerprint;
    use crate::storage::queries::{insert_project, list_project_names, list_saving_goals};
    use crate::storage::schema::LEGACY_ACCOUNT_PREFERENCES_TABLE;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> Config {
        Config::new(dir.join("planning.db"), dir.join("ledger.db"))
    }

    fn write_ledger(path: &Path, labels: &[&str]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch("CREATE TABLE splits (id INTEGER PRIMARY KEY, project TEXT)")
            .unwrap();
        for label in labels {
            conn.execute("INSERT INTO splits (project) VALUES (?1)", [label])
                .unwrap();
        }
    }

    fn seed_store(path: &Path, sql: &str) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(sql).unwrap();
    }

    fn fingerprint_of(path: &Path) -> String {
        let store = LocalStore::load(path).unwrap();
        schema_fingerprint(store.conn()).unwrap()
    }

    fn reference_fingerprint() -> String {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        migrate_store(&config).unwrap();
        fingerprint_of(&config.store_path)
    }

    #[test]
    fn test_default_plan_keeps_declaration_order() {
        let conn = Connection::open_in_memory().unwrap();
        let steps = default_steps();
        let order = plan(&steps, &conn).unwrap();
        assert_eq!(order, (0..steps.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_column_steps_match_schema() {
        let declared: Vec<(&str, &str)> = default_steps()
            .iter()
            .filter_map(|step| match step.action {
                StepAction::AddColumn {
                    table: "projects",
                    column,
                    definition,
                } if column != "created_at" => Some((column, definition)),
                _ => None,
            })
            .collect();
        assert_eq!(declared, crate::storage::schema::PROJECT_COLUMNS);
    }

    #[test]
    fn test_any_declaration_order_converges() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        let count = default_steps().len();

        for rotation in 0..count {
            let mut steps = default_steps();
            steps.reverse();
            steps.rotate_left(rotation);

            let mut store = LocalStore::open_memory().unwrap();
            let report = Migrator::with_steps(&config, steps).run(&mut store).unwrap();

            assert_eq!(report.failed(), 0, "rotation {rotation}: {report:?}");
            assert_eq!(report.steps.len(), count);
            assert!(table_exists(store.conn(), "saving_goals").unwrap());
        }
    }

    #[test]
    fn test_bootstrap_failure_does_not_stop_migration() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        write_ledger(&config.ledger_path, &["Trip"]);
        seed_store(
            &config.store_path,
            "CREATE TABLE projects (id TEXT PRIMARY KEY, name TEXT NOT NULL UNIQUE);",
        );

        let first = migrate_store(&config).unwrap();

        assert!(matches!(
            first.bootstrap.outcome,
            StepOutcome::Failed { .. }
        ));
        assert_eq!(first.migration.failed(), 0);
        assert_eq!(
            first.migration.outcome("column:projects.created_at"),
            Some(&StepOutcome::Applied)
        );
        assert_eq!(
            first.migration.outcome("sync:projects"),
            Some(&StepOutcome::Applied)
        );

        let store = LocalStore::load(&config.store_path).unwrap();
        assert!(table_exists(store.conn(), "settings").unwrap());
        assert_eq!(list_project_names(store.conn()).unwrap(), vec!["Trip"]);
        drop(store);
        assert_eq!(fingerprint_of(&config.store_path), reference_fingerprint());

        let second = migrate_store(&config).unwrap();
        assert_eq!(second.bootstrap.outcome, StepOutcome::Unchanged);
        assert_eq!(second.migration.applied(), 0);
        assert!(!second.persisted);
    }

    #[test]
    fn test_unreadable_project_does_not_block_goal_backfill() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        seed_store(
            &config.store_path,
            &format!(
                "{PROJECTS_TABLE}
                 ALTER TABLE projects ADD COLUMN start_date TEXT;
                 ALTER TABLE projects ADD COLUMN end_date TEXT;
                 ALTER TABLE projects ADD COLUMN planned_total REAL;
                 INSERT INTO projects (id, name, created_at, start_date, end_date, planned_total)
                 VALUES ('p_good', 'Good', 0, '2024-01-01', '2024-03-01', 1000),
                        ('p_bad', 'Bad', 0, '2024-01-01', '2024-03-01', 'n/a');"
            ),
        );

        let summary = migrate_store(&config).unwrap();

        assert_eq!(
            summary.migration.outcome("table:saving_goals"),
            Some(&StepOutcome::Applied)
        );
        let store = LocalStore::load(&config.store_path).unwrap();
        let goals = list_saving_goals(store.conn()).unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].project_id, "p_good");
        assert_eq!(goals[0].amount, 334.0);
    }

    #[test]
    fn test_plan_reorders_by_requirement() {
        let conn = Connection::open_in_memory().unwrap();
        let steps = vec![
            Step {
                name: "index:idx_transactions_month",
                provides: &[],
                requires: &["transactions"],
                action: StepAction::CreateIndex {
                    name: "idx_transactions_month",
                    ddl: TRANSACTIONS_MONTH_INDEX,
                },
            },
            Step {
                name: "table:transactions",
                provides: &["transactions"],
                requires: &["projects"],
                action: StepAction::CreateTable {
                    table: "transactions",
                    ddl: TRANSACTIONS_TABLE,
                },
            },
            Step {
                name: "table:projects",
                provides: &["projects"],
                requires: &[],
                action: StepAction::CreateTable {
                    table: "projects",
                    ddl: PROJECTS_TABLE,
                },
            },
        ];
        assert_eq!(plan(&steps, &conn).unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn test_plan_rejects_cycle() {
        fn noop(_: &Connection, _: &StepContext<'_>) -> Result<bool> {
            Ok(false)
        }
        let conn = Connection::open_in_memory().unwrap();
        let steps = vec![
            Step {
                name: "a",
                provides: &["a"],
                requires: &["b"],
                action: StepAction::Custom(noop),
            },
            Step {
                name: "b",
                provides: &["b"],
                requires: &["a"],
                action: StepAction::Custom(noop),
            },
        ];
        let err = plan(&steps, &conn).unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { ref steps } if steps.len() == 2));
    }

    #[test]
    fn test_plan_missing_dependency_unless_present() {
        let conn = Connection::open_in_memory().unwrap();
        let steps = vec![Step {
            name: "index:idx_transactions_month",
            provides: &[],
            requires: &["transactions"],
            action: StepAction::CreateIndex {
                name: "idx_transactions_month",
                ddl: TRANSACTIONS_MONTH_INDEX,
            },
        }];
        assert!(matches!(
            plan(&steps, &conn),
            Err(Error::MissingDependency { .. })
        ));

        conn.execute_batch("CREATE TABLE transactions (month TEXT)").unwrap();
        assert_eq!(plan(&steps, &conn).unwrap(), vec![0]);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        write_ledger(&config.ledger_path, &["Trip", "Car"]);

        let first = migrate_store(&config).unwrap();
        assert!(first.persisted);
        assert_eq!(first.migration.failed(), 0);
        let bytes = fs::read(&config.store_path).unwrap();
        let fingerprint = fingerprint_of(&config.store_path);

        let second = migrate_store(&config).unwrap();
        assert!(!second.persisted);
        assert_eq!(second.migration.applied(), 0);
        assert_eq!(second.migration.unchanged(), default_steps().len());
        assert_eq!(fs::read(&config.store_path).unwrap(), bytes);
        assert_eq!(fingerprint_of(&config.store_path), fingerprint);
    }

    #[test]
    fn test_reentry_from_projects_only() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        seed_store(
            &config.store_path,
            &format!("{PROJECTS_TABLE} INSERT INTO projects VALUES ('proj_1', 'Trip', 0);"),
        );

        let summary = migrate_store(&config).unwrap();

        assert_eq!(summary.migration.failed(), 0);
        assert_eq!(fingerprint_of(&config.store_path), reference_fingerprint());
        let store = LocalStore::load(&config.store_path).unwrap();
        assert_eq!(list_project_names(store.conn()).unwrap(), vec!["Trip"]);
    }

    #[test]
    fn test_reentry_from_half_migrated_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        seed_store(
            &config.store_path,
            &format!(
                "{PROJECTS_TABLE}
                 ALTER TABLE projects ADD COLUMN start_date TEXT;
                 {SAVINGS_AMOUNTS_TABLE}
                 {TRANSACTIONS_TABLE}
                 {TRANSACTIONS_PROJECT_INDEX};"
            ),
        );

        let summary = migrate_store(&config).unwrap();

        assert_eq!(summary.migration.failed(), 0);
        assert_eq!(
            summary.migration.outcome("table:transactions"),
            Some(&StepOutcome::Unchanged)
        );
        assert_eq!(
            summary.migration.outcome("index:idx_transactions_month"),
            Some(&StepOutcome::Applied)
        );
        assert_eq!(fingerprint_of(&config.store_path), reference_fingerprint());
    }

    #[test]
    fn test_reentry_from_legacy_account_preferences() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        seed_store(
            &config.store_path,
            &format!(
                "{PROJECTS_TABLE}
                 {LEGACY_ACCOUNT_PREFERENCES_TABLE}
                 INSERT INTO projects VALUES ('proj_1', 'Trip', 0);
                 INSERT INTO account_preferences (account_id, excluded) VALUES ('acc_1', 1);"
            ),
        );

        let summary = migrate_store(&config).unwrap();

        assert_eq!(
            summary.migration.outcome("transform:account_preferences"),
            Some(&StepOutcome::Applied)
        );
        assert_eq!(fingerprint_of(&config.store_path), reference_fingerprint());
    }

    #[test]
    fn test_goal_backfill_runs_once() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        seed_store(&config.store_path, PROJECTS_TABLE);
        {
            let mut store = LocalStore::load(&config.store_path).unwrap();
            Migrator::new(&config).run(&mut store).unwrap();
            store.persist().unwrap();
        }

        // A project that qualifies only after the goal table exists.
        LocalStore::scoped(&config.store_path, |store| {
            store
                .conn()
                .execute_batch("DROP INDEX idx_saving_goals_project; DROP TABLE saving_goals;")?;
            let mut project = Project::new("Trip".to_string());
            project.planned_total = Some(1000.0);
            project.start_date = Some("2024-01-01".to_string());
            project.end_date = Some("2024-03-01".to_string());
            insert_project(store.conn(), &project)?;
            store.mark_dirty();
            Ok(())
        })
        .unwrap();

        migrate_store(&config).unwrap();
        migrate_store(&config).unwrap();

        let store = LocalStore::load(&config.store_path).unwrap();
        let goals = list_saving_goals(store.conn()).unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].amount, 334.0);
        assert_eq!(goals[0].start_month, "2024-01-01");
        assert!(goals[0].end_month.is_none());
        assert!(goals[0].is_initial());
    }

    #[test]
    fn test_failing_step_does_not_stop_others() {
        fn broken(conn: &Connection, _: &StepContext<'_>) -> Result<bool> {
            conn.execute_batch("CREATE TABLE half_done (id INTEGER)")?;
            Err(Error::Other("transient".to_string()))
        }

        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        let mut steps = vec![Step {
            name: "broken",
            provides: &[],
            requires: &[],
            action: StepAction::Custom(broken),
        }];
        steps.extend(default_steps());

        let mut store = LocalStore::open_memory().unwrap();
        let report = Migrator::with_steps(&config, steps).run(&mut store).unwrap();

        assert!(matches!(
            report.outcome("broken"),
            Some(StepOutcome::Failed { .. })
        ));
        assert_eq!(report.failed(), 1);
        assert_eq!(report.steps.len(), default_steps().len() + 1);
        // The failed step's partial work was rolled back
        assert!(!table_exists(store.conn(), "half_done").unwrap());
        assert!(table_exists(store.conn(), "settings").unwrap());
    }

    #[test]
    fn test_report_serializes_outcomes() {
        let report = MigrationReport {
            steps: vec![
                StepReport {
                    name: "table:projects".to_string(),
                    outcome: StepOutcome::Applied,
                },
                StepReport {
                    name: "sync:projects".to_string(),
                    outcome: StepOutcome::Failed {
                        error: "boom".to_string(),
                    },
                },
            ],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["outcome"], "applied");
        assert_eq!(json["steps"][1]["outcome"], "failed");
        assert_eq!(json["steps"][1]["error"], "boom");
    }
}
