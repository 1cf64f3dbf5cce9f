//! Planning records derived from imported projects.

pub mod goals;

pub use goals::{DerivedGoal, backfill_initial_goals, derive_initial_goal, monthly_amount};
