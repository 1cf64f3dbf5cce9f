//! SQLite storage layer for the planning store.
//!
//! The store is a single SQLite file, loaded wholly into memory and written
//! wholly back (see [`store`]). Its schema is never versioned; instead the
//! migration steps inspect the live schema and add whatever is missing.
//!
//! # Submodules
//!
//! - [`store`] - Whole-file load and atomic persist
//! - [`introspect`] - Read-only schema questions and fingerprinting
//! - [`schema`] - Table and index definitions
//! - [`migrations`] - Step list, planner and orchestrator
//! - [`account_flags`] - Legacy account preference conversion
//! - [`bootstrap`] - First-run seeding from the ledger
//! - [`queries`] - Row-level reads and writes

pub mod account_flags;
pub mod bootstrap;
pub mod introspect;
pub mod migrations;
pub mod queries;
pub mod schema;
pub mod store;

pub use bootstrap::{BootstrapReport, Bootstrapper, StoreState};
pub use migrations::{
    MigrationReport, Migrator, RunSummary, Step, StepAction, StepOutcome, StepReport,
    default_steps, migrate_store, plan,
};
pub use store::LocalStore;
