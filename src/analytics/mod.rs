//! Derived analytics over the reflection collection.
//!
//! - [`stats`]: full-recompute aggregation (streaks, mood trend, scores)
//! - [`insights`]: rule-based observations with a bounded retained list
//! - [`goals`]: per-goal progress against elapsed time
//!
//! All functions are pure and take `now` explicitly.

pub mod goals;
pub mod insights;
pub mod stats;

pub use goals::{goal_progress, update_goal_progress, GoalProgress};
pub use insights::{generate_insights, merge_insights, rank_insights};
pub use stats::recompute_stats;
