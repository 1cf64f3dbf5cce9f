//! Status command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::storage::account_flags::{FlagState, detect_flag_state};
use crate::storage::introspect::{list_tables, row_count, schema_fingerprint};
use crate::storage::queries::list_saving_goals;
use crate::storage::{LocalStore, StoreState};
use crate::sync::file_size;
use colored::Colorize;
use serde::Serialize;

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    store_path: String,
    store_exists: bool,
    store_bytes: u64,
    state: &'static str,
    ledger_path: String,
    ledger_exists: bool,
    tables: Vec<TableInfo>,
    account_flags: &'static str,
    initial_goals: usize,
    fingerprint: String,
}

#[derive(Serialize)]
struct TableInfo {
    name: String,
    rows: i64,
}

/// Report the store's current shape without changing it.
///
/// # Errors
///
/// Returns an error if the store exists but cannot be read.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let store = LocalStore::load(&config.store_path)?;
    let conn = store.conn();

    let tables = list_tables(conn)?
        .into_iter()
        .map(|name| {
            let rows = row_count(conn, &name)?;
            Ok(TableInfo { name, rows })
        })
        .collect::<Result<Vec<_>>>()?;

    let initial_goals = if tables.iter().any(|t| t.name == "saving_goals") {
        list_saving_goals(conn)?
            .iter()
            .filter(|g| g.is_initial())
            .count()
    } else {
        0
    };

    let output = StatusOutput {
        store_path: config.store_path.display().to_string(),
        store_exists: store.existed(),
        store_bytes: file_size(&config.store_path),
        state: StoreState::detect(&store)?.as_str(),
        ledger_path: config.ledger_path.display().to_string(),
        ledger_exists: config.ledger_path.exists(),
        tables,
        account_flags: flag_state_label(detect_flag_state(conn)?),
        initial_goals,
        fingerprint: schema_fingerprint(conn)?,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Plansync Status".cyan().bold());
    println!("===============");
    println!();
    println!(
        "Store:  {} ({}, {} bytes)",
        output.store_path, output.state, output.store_bytes
    );
    let ledger = if output.ledger_exists {
        "found".green()
    } else {
        "missing".yellow()
    };
    println!("Ledger: {} ({ledger})", output.ledger_path);
    println!();

    if output.tables.is_empty() {
        println!("No tables yet. Run `plansync migrate`.");
    } else {
        println!("{}", "Tables".cyan().bold());
        for table in &output.tables {
            println!("  {:<24} {:>8}", table.name, table.rows);
        }
    }
    println!();
    println!("Account flags: {}", output.account_flags);
    println!("Initial goals: {}", output.initial_goals);
    println!("Fingerprint:   {}", &output.fingerprint[..16]);

    Ok(())
}

const fn flag_state_label(state: FlagState) -> &'static str {
    match state {
        FlagState::Absent => "absent",
        FlagState::LegacyOnly => "legacy",
        FlagState::Partial => "partial",
        FlagState::Transitional => "transitional",
        FlagState::Incomplete => "incomplete",
        FlagState::Clean => "clean",
    }
}
