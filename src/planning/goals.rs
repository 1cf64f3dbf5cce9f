//! Initial saving goal derivation.
//!
//! A project with a planned total and a date range gets one open-ended
//! goal whose monthly amount spreads the total over the months of the
//! range. The amount is rounded up, so saving it every month always reaches
//! at least the planned total.
//!
//! The backfill runs exactly once: in the same transaction that creates
//! the `saving_goals` table.

use crate::error::Result;
use crate::model::{INITIAL_GOAL_REASON, MonthKey, Project};
use crate::storage::queries::{insert_saving_goal, list_projects};
use rusqlite::Connection;
use tracing::{debug, warn};

/// A goal derived from a project, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedGoal {
    pub project_id: String,
    pub amount: f64,
    pub start_month: MonthKey,
}

/// Monthly amount for `planned_total` spread over `months` months.
///
/// Returns `None` when the month count is not positive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn monthly_amount(planned_total: f64, months: i64) -> Option<f64> {
    if months <= 0 {
        return None;
    }
    Some((planned_total / months as f64).ceil())
}

/// Derive the initial goal for a project.
///
/// Returns `None` if the project lacks a positive planned total or either
/// date, if a date does not parse, or if the range is empty.
#[must_use]
pub fn derive_initial_goal(project: &Project) -> Option<DerivedGoal> {
    if !project.has_goal_inputs() {
        return None;
    }
    let planned_total = project.planned_total?;

    let start = project.start_date.as_deref().and_then(MonthKey::parse);
    let end = project.end_date.as_deref().and_then(MonthKey::parse);
    let (Some(start), Some(end)) = (start, end) else {
        warn!(project = %project.name, "Skipping goal derivation: unparseable date range");
        return None;
    };

    let months = start.months_through(end);
    let Some(amount) = monthly_amount(planned_total, months) else {
        warn!(project = %project.name, months, "Skipping goal derivation: empty date range");
        return None;
    };

    Some(DerivedGoal {
        project_id: project.id.clone(),
        amount,
        start_month: start,
    })
}

/// Insert one initial goal for every qualifying project.
///
/// Returns the number of goals inserted.
///
/// # Errors
///
/// Returns an error if projects cannot be read or an insert fails.
pub fn backfill_initial_goals(conn: &Connection, now: i64) -> Result<usize> {
    let mut inserted = 0;

    for project in list_projects(conn)? {
        let Some(goal) = derive_initial_goal(&project) else {
            continue;
        };
        insert_saving_goal(
            conn,
            &goal.project_id,
            goal.amount,
            &goal.start_month.to_string(),
            None,
            INITIAL_GOAL_REASON,
            now,
        )?;
        debug!(project = %project.name, amount = goal.amount, "Derived initial saving goal");
        inserted += 1;
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(total: Option<f64>, start: Option<&str>, end: Option<&str>) -> Project {
        let mut p = Project::new("Trip".to_string());
        p.planned_total = total;
        p.start_date = start.map(str::to_string);
        p.end_date = end.map(str::to_string);
        p
    }

    #[test]
    fn test_monthly_amount_rounds_up() {
        assert_eq!(monthly_amount(1000.0, 3), Some(334.0));
        assert_eq!(monthly_amount(900.0, 3), Some(300.0));
        assert_eq!(monthly_amount(1.0, 12), Some(1.0));
        assert_eq!(monthly_amount(1000.0, 0), None);
        assert_eq!(monthly_amount(1000.0, -2), None);
    }

    #[test]
    fn test_derive_three_month_range() {
        let p = project(Some(1000.0), Some("2024-01-15"), Some("2024-03-02"));
        let goal = derive_initial_goal(&p).unwrap();
        assert_eq!(goal.amount, 334.0);
        assert_eq!(goal.start_month.to_string(), "2024-01-01");
        assert_eq!(goal.project_id, p.id);
    }

    #[test]
    fn test_derive_across_year_boundary() {
        let p = project(Some(1200.0), Some("2024-11"), Some("2025-02"));
        assert_eq!(derive_initial_goal(&p).unwrap().amount, 300.0);
    }

    #[test]
    fn test_derive_skips_unqualified() {
        assert!(derive_initial_goal(&project(None, Some("2024-01"), Some("2024-03"))).is_none());
        assert!(derive_initial_goal(&project(Some(0.0), Some("2024-01"), Some("2024-03"))).is_none());
        assert!(derive_initial_goal(&project(Some(10.0), None, Some("2024-03"))).is_none());
        assert!(derive_initial_goal(&project(Some(10.0), Some("soon"), Some("2024-03"))).is_none());
        // End before start
        assert!(derive_initial_goal(&project(Some(10.0), Some("2024-05"), Some("2024-03"))).is_none());
    }
}
