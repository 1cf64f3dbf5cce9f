//! Saving goal model.
//!
//! A saving goal is a monthly target for one project, valid from its start
//! month until its end month (or indefinitely when `end_month` is `None`).
//! A project may carry several goals over time.

use serde::{Deserialize, Serialize};

/// Reason recorded on goals created by the one-time backfill.
pub const INITIAL_GOAL_REASON: &str = "initial";

/// A saving goal row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingGoal {
    pub id: i64,
    pub project_id: String,
    /// Monthly amount, never negative
    pub amount: f64,
    /// Inclusive start month (`YYYY-MM-01`)
    pub start_month: String,
    /// Inclusive end month, `None` for open-ended goals
    pub end_month: Option<String>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    pub reason: String,
}

impl SavingGoal {
    /// Whether this goal was produced by the automatic backfill.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.reason == INITIAL_GOAL_REASON
    }
}
