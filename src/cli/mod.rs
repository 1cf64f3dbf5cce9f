//! CLI definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Plansync - local financial planning store synchronized from a ledger
#[derive(Parser, Debug)]
#[command(name = "plansync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Planning store path (default: <data dir>/plansync/planning.db)
    #[arg(long, global = true, env = "PLANSYNC_STORE")]
    pub store: Option<PathBuf>,

    /// External ledger path, opened read-only (default: <data dir>/plansync/ledger.db)
    #[arg(long, global = true, env = "PLANSYNC_LEDGER")]
    pub ledger: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap and migrate the planning store (run at every startup)
    Migrate,

    /// Seed a missing or empty store from the ledger, without migrating
    Bootstrap,

    /// Import new projects from the ledger into a migrated store
    Sync,

    /// Show the store's schema state
    Status,

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
