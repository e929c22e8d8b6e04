//! Goal progress tracking.
//!
//! Progress is a pure function of the goal's frequency, the time elapsed since
//! its start date and the matching-category reflections written since then.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::model::{Goal, Reflection};

/// Breakdown of a goal's progress computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    /// Percentage (0-100).
    pub progress: f64,
    /// Reflections the frequency calls for so far.
    pub expected: u32,
    /// Matching reflections written since the start date.
    pub actual: usize,
    /// Share of the goal's time span that has elapsed (0.0-1.0).
    pub elapsed_ratio: f64,
}

/// Compute progress without touching the goal.
pub fn goal_progress<'a, I>(goal: &Goal, reflections: I, now: DateTime<Utc>) -> GoalProgress
where
    I: IntoIterator<Item = &'a Reflection>,
{
    let end = now.min(goal.target_date);
    let elapsed = if end > goal.start_date {
        end - goal.start_date
    } else {
        chrono::Duration::zero()
    };

    let expected = (elapsed.num_days() / goal.target_frequency.period_days()).max(0) as u32;
    let actual = reflections
        .into_iter()
        .filter(|r| {
            r.category == goal.category && r.created_at >= goal.start_date && r.created_at <= now
        })
        .count();

    let progress = if expected == 0 {
        0.0
    } else {
        (actual as f64 / f64::from(expected) * 100.0).min(100.0)
    };

    let span = (goal.target_date - goal.start_date).num_seconds();
    let elapsed_ratio = if span > 0 {
        (elapsed.num_seconds() as f64 / span as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    GoalProgress {
        progress,
        expected,
        actual,
        elapsed_ratio,
    }
}

/// Recompute and store a goal's progress. Inactive goals keep their last value.
pub fn update_goal_progress<'a, I>(goal: &mut Goal, reflections: I, now: DateTime<Utc>) -> f64
where
    I: IntoIterator<Item = &'a Reflection>,
{
    if !goal.is_active {
        return goal.progress;
    }
    let computed = goal_progress(goal, reflections, now);
    debug!(
        goal_id = %goal.id,
        expected = computed.expected,
        actual = computed.actual,
        progress = computed.progress,
        "Updated goal progress"
    );
    goal.progress = computed.progress;
    goal.progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, GoalFrequency, ReflectionDraft};
    use chrono::Duration;

    fn reflections(category: Category, count: i64, now: DateTime<Utc>) -> Vec<Reflection> {
        (0..count)
            .map(|d| {
                let at = now - Duration::days(d);
                Reflection::from_draft(ReflectionDraft::new("t", "c", category).at(at), at).unwrap()
            })
            .collect()
    }

    fn daily_goal(now: DateTime<Utc>) -> Goal {
        Goal::new(
            "Daily gratitude",
            Category::Gratitude,
            GoalFrequency::Daily,
            now - Duration::days(10),
            now + Duration::days(20),
        )
        .unwrap()
    }

    #[test]
    fn test_daily_goal_full_progress_caps_at_100() {
        let now = Utc::now();
        let mut goal = daily_goal(now);
        let items = reflections(Category::Gratitude, 10, now);
        assert_eq!(update_goal_progress(&mut goal, &items, now), 100.0);
        assert_eq!(goal.progress, 100.0);
    }

    #[test]
    fn test_daily_goal_half_progress() {
        let now = Utc::now();
        let mut goal = daily_goal(now);
        let items = reflections(Category::Gratitude, 5, now);
        assert_eq!(update_goal_progress(&mut goal, &items, now), 50.0);
    }

    #[test]
    fn test_other_categories_do_not_count() {
        let now = Utc::now();
        let goal = daily_goal(now);
        let items = reflections(Category::Coping, 10, now);
        let computed = goal_progress(&goal, &items, now);
        assert_eq!(computed.actual, 0);
        assert_eq!(computed.progress, 0.0);
    }

    #[test]
    fn test_zero_expected_gives_zero_progress() {
        let now = Utc::now();
        let goal = Goal::new(
            "Weekly review",
            Category::Progress,
            GoalFrequency::Weekly,
            now - Duration::days(3),
            now + Duration::days(30),
        )
        .unwrap();
        let items = reflections(Category::Progress, 3, now);
        let computed = goal_progress(&goal, &items, now);
        assert_eq!(computed.expected, 0);
        assert_eq!(computed.progress, 0.0);
        assert_eq!(computed.actual, 3);
    }

    #[test]
    fn test_inactive_goal_not_recomputed() {
        let now = Utc::now();
        let mut goal = daily_goal(now);
        goal.is_active = false;
        goal.progress = 12.0;
        let items = reflections(Category::Gratitude, 10, now);
        assert_eq!(update_goal_progress(&mut goal, &items, now), 12.0);
    }

    #[test]
    fn test_elapsed_ratio() {
        let now = Utc::now();
        let goal = daily_goal(now);
        let computed = goal_progress(&goal, Vec::<&Reflection>::new(), now);
        assert!((computed.elapsed_ratio - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_reflections_before_start_ignored() {
        let now = Utc::now();
        let mut goal = daily_goal(now);
        goal.start_date = now - Duration::days(4);
        let items = reflections(Category::Gratitude, 10, now);
        let computed = goal_progress(&goal, &items, now);
        // Days 0..=4 fall on or after the start date.
        assert_eq!(computed.actual, 5);
        assert_eq!(computed.expected, 4);
        assert_eq!(computed.progress, 100.0);
    }
}
