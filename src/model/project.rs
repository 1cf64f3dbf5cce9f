//! Project model for Plansync.
//!
//! Projects are named planning buckets. Most are imported from the project
//! labels of the external ledger; an operator may also create them directly.
//! Projects are never deleted, only archived.

use serde::{Deserialize, Serialize};

/// A project in the local planning store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (`proj_` + 12 hex chars)
    pub id: String,

    /// Display name, unique across the store
    pub name: String,

    /// Optional start date (ISO text, day or month precision)
    pub start_date: Option<String>,

    /// Optional end date (ISO text, day or month precision)
    pub end_date: Option<String>,

    /// Planned total budget for the whole date range
    pub planned_total: Option<f64>,

    /// Archived projects are hidden from planning but kept for history
    #[serde(default)]
    pub archived: bool,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Project {
    /// Create a new project with only a name.
    pub fn new(name: String) -> Self {
        Self {
            id: new_project_id(),
            name,
            start_date: None,
            end_date: None,
            planned_total: None,
            archived: false,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Whether this project carries enough data to derive an initial saving goal.
    ///
    /// Requires a positive planned total and both ends of the date range.
    /// Whether the dates actually parse is checked during derivation.
    #[must_use]
    pub fn has_goal_inputs(&self) -> bool {
        self.planned_total.is_some_and(|t| t > 0.0)
            && self.start_date.is_some()
            && self.end_date.is_some()
    }
}

/// Generate a fresh project ID.
#[must_use]
pub fn new_project_id() -> String {
    format!("proj_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}
