//! Data models for Plansync.
//!
//! This module contains the domain models:
//! - Project
//! - SavingGoal
//! - AccountPreference
//! - MonthKey

pub mod account_preference;
pub mod month;
pub mod project;
pub mod saving_goal;

pub use account_preference::AccountPreference;
pub use month::MonthKey;
pub use project::Project;
pub use saving_goal::{INITIAL_GOAL_REASON, SavingGoal};
