//! Error types for the Plansync CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=store, 3=ledger, 4=validation, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Plansync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Local store (exit 2)
    StoreUnreadable,
    NotMigrated,
    DatabaseError,

    // External ledger (exit 3)
    LedgerSchema,

    // Validation (exit 4)
    InvalidIdentifier,
    InvalidArgument,

    // Migration plan (exit 5)
    DependencyCycle,
    MissingDependency,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::StoreUnreadable => "STORE_UNREADABLE",
            Self::NotMigrated => "NOT_MIGRATED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::LedgerSchema => "LEDGER_SCHEMA",
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DependencyCycle => "DEPENDENCY_CYCLE",
            Self::MissingDependency => "MISSING_DEPENDENCY",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::StoreUnreadable | Self::NotMigrated | Self::DatabaseError => 2,
            Self::LedgerSchema => 3,
            Self::InvalidIdentifier | Self::InvalidArgument => 4,
            Self::DependencyCycle | Self::MissingDependency => 5,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether re-running the same command may succeed without operator action.
    ///
    /// Database and ledger errors are often transient (locked file, ledger
    /// mid-write by the desktop application). A corrupt store is not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::DatabaseError | Self::LedgerSchema | Self::IoError)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Plansync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Local store at {path} is unreadable: {message}")]
    StoreUnreadable { path: PathBuf, message: String },

    #[error("Local store at {path} has not been migrated yet")]
    NotMigrated { path: PathBuf },

    #[error("Ledger schema error: {0}")]
    LedgerSchema(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Migration steps form a cycle: {}", steps.join(" -> "))]
    DependencyCycle { steps: Vec<String> },

    #[error("Step {step} requires table {table}, which no step provides")]
    MissingDependency { step: String, table: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::StoreUnreadable { .. } => ErrorCode::StoreUnreadable,
            Self::NotMigrated { .. } => ErrorCode::NotMigrated,
            Self::LedgerSchema(_) => ErrorCode::LedgerSchema,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidIdentifier(_) => ErrorCode::InvalidIdentifier,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::DependencyCycle { .. } => ErrorCode::DependencyCycle,
            Self::MissingDependency { .. } => ErrorCode::MissingDependency,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::StoreUnreadable { path, .. } => Some(format!(
                "The planning store is not a valid database. Move {} aside and run \
                 `plansync migrate` to rebuild it from the ledger.",
                path.display()
            )),
            Self::NotMigrated { .. } => Some("Run `plansync migrate` first.".to_string()),
            Self::LedgerSchema(_) => Some(
                "Check that --ledger points at the finance application's database, \
                 or set PLANSYNC_LEDGER_SPLIT_TABLE / PLANSYNC_LEDGER_PROJECT_COLUMN."
                    .to_string(),
            ),
            Self::InvalidIdentifier(_) => Some(
                "Identifiers may contain ASCII letters, digits and underscores, \
                 and must not start with a digit."
                    .to_string(),
            ),
            Self::Config(_) => Some(
                "Pass --store explicitly or set PLANSYNC_STORE to a writable path.".to_string(),
            ),
            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::DependencyCycle { .. }
            | Self::MissingDependency { .. }
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
