//! Plansync - local financial planning store synchronized from a ledger
//!
//! This crate provides the core functionality for the `plansync` CLI tool:
//! a whole-file SQLite planning store that is bootstrapped and migrated on
//! every startup, and kept in step with the project labels of a read-only
//! external ledger.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Store and ledger locations, resolved once
//! - [`model`] - Data types (Project, SavingGoal, AccountPreference, MonthKey)
//! - [`storage`] - Store persistence, schema, migration steps and orchestrator
//! - [`sync`] - Ledger access, project import, atomic file writes
//! - [`planning`] - Initial saving goal derivation
//! - [`validate`] - Identifier and label validation
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod planning;
pub mod storage;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};
