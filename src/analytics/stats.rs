//! Aggregation engine: a full recompute of [`Stats`] from the reflection set.
//!
//! Stats are never patched incrementally. Every mutation re-runs
//! [`recompute_stats`] over the whole collection so the snapshot can never
//! drift from the reflections it summarizes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::config::EngineSettings;
use crate::model::{Category, MoodTrend, Reflection, Stats, TrendDirection, NEUTRAL_MOOD};

/// Mean difference between trend halves that counts as a real change.
pub const TREND_THRESHOLD: f64 = 0.5;

/// Recompute every statistic from scratch.
pub fn recompute_stats<'a, I>(reflections: I, settings: &EngineSettings, now: DateTime<Utc>) -> Stats
where
    I: IntoIterator<Item = &'a Reflection>,
{
    let reflections: Vec<&Reflection> = reflections.into_iter().collect();
    if reflections.is_empty() {
        return Stats::empty(settings.weekly_goal);
    }

    let total = reflections.len();
    let average_mood = average_mood(&reflections);

    let mut category_breakdown: BTreeMap<Category, usize> =
        Category::ALL.iter().map(|c| (*c, 0)).collect();
    for reflection in &reflections {
        *category_breakdown.entry(reflection.category).or_insert(0) += 1;
    }
    let most_active_category = most_active_category(&category_breakdown);

    let days: BTreeSet<NaiveDate> = reflections.iter().map(|r| r.day()).collect();
    let current_streak = current_streak(&days, now.date_naive());
    let longest_streak = longest_streak(&days);

    let mood_trend = mood_trend(&reflections, average_mood, settings, now);

    let week_start = now - Duration::days(7);
    let reflections_this_week = reflections
        .iter()
        .filter(|r| r.created_at >= week_start && r.created_at <= now)
        .count();
    let progress_to_goal = progress_to_goal(reflections_this_week, settings.weekly_goal);

    let therapeutic_count = reflections
        .iter()
        .filter(|r| r.category.is_therapeutic())
        .count();
    let therapeutic_insights = reflections
        .iter()
        .filter(|r| r.metadata.insights.iter().any(|n| !n.trim().is_empty()))
        .count();
    let crisis_flagged = reflections.iter().filter(|r| r.is_crisis_flagged()).count();

    let emotional_growth_score =
        emotional_growth_score(longest_streak, average_mood, therapeutic_count, progress_to_goal);

    debug!(
        total,
        current_streak,
        longest_streak,
        crisis_flagged,
        "Recomputed reflection stats"
    );

    Stats {
        total_reflections: total,
        average_mood,
        most_active_category,
        current_streak,
        longest_streak,
        category_breakdown,
        mood_trend,
        weekly_goal: settings.weekly_goal,
        reflections_this_week,
        progress_to_goal,
        emotional_growth_score,
        therapeutic_insights,
        crisis_safety_score: crisis_safety_score(crisis_flagged, total),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean of recorded moods, or the scale midpoint when none exist.
pub fn average_mood(reflections: &[&Reflection]) -> f64 {
    let moods: Vec<f64> = reflections
        .iter()
        .filter_map(|r| r.mood.map(f64::from))
        .collect();
    mean(&moods).unwrap_or(NEUTRAL_MOOD)
}

/// Highest count wins; ties go to the earlier category in canonical order.
pub fn most_active_category(breakdown: &BTreeMap<Category, usize>) -> Option<Category> {
    let mut best: Option<(Category, usize)> = None;
    for category in Category::ALL {
        let count = breakdown.get(&category).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((category, count)),
        }
    }
    best.map(|(category, _)| category)
}

/// Consecutive days with a reflection, walking back from `today`.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive days anywhere in history.
pub fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }
    longest
}

/// Split the windowed moods into chronological halves and compare means.
pub fn mood_trend(
    reflections: &[&Reflection],
    average_mood: f64,
    settings: &EngineSettings,
    now: DateTime<Utc>,
) -> MoodTrend {
    // An unrepresentable window covers the whole collection.
    let window_start = Duration::try_days(settings.mood_trend_window_days)
        .and_then(|span| now.checked_sub_signed(span));
    let mut window: Vec<(DateTime<Utc>, f64)> = reflections
        .iter()
        .filter(|r| window_start.map_or(true, |start| r.created_at >= start) && r.created_at <= now)
        .filter_map(|r| r.mood.map(|m| (r.created_at, f64::from(m))))
        .collect();
    window.sort_by_key(|(at, _)| *at);

    let moods: Vec<f64> = window.iter().map(|(_, m)| *m).collect();
    let average = mean(&moods).unwrap_or(average_mood);

    if moods.len() < 2 {
        return MoodTrend {
            average,
            ..Default::default()
        };
    }

    let mid = moods.len() / 2;
    let first = mean(&moods[..mid]).unwrap_or(average);
    let second = mean(&moods[mid..]).unwrap_or(average);
    let monthly_change = second - first;

    let direction = if monthly_change > TREND_THRESHOLD {
        TrendDirection::Improving
    } else if monthly_change < -TREND_THRESHOLD {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    let last_week_start = now - Duration::days(7);
    let prior_week_start = now - Duration::days(14);
    let last_week: Vec<f64> = window
        .iter()
        .filter(|(at, _)| *at >= last_week_start)
        .map(|(_, m)| *m)
        .collect();
    let prior_week: Vec<f64> = window
        .iter()
        .filter(|(at, _)| *at >= prior_week_start && *at < last_week_start)
        .map(|(_, m)| *m)
        .collect();
    let weekly_change = match (mean(&last_week), mean(&prior_week)) {
        (Some(last), Some(prior)) => last - prior,
        _ => 0.0,
    };

    MoodTrend {
        average,
        direction,
        weekly_change,
        monthly_change,
    }
}

/// Percentage of the weekly goal met, capped at 100.
pub fn progress_to_goal(reflections_this_week: usize, weekly_goal: u32) -> f64 {
    if weekly_goal == 0 {
        return 0.0;
    }
    (reflections_this_week as f64 / f64::from(weekly_goal) * 100.0).min(100.0)
}

/// 100 minus the percentage of crisis-flagged reflections; 100 when empty.
pub fn crisis_safety_score(crisis_flagged: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (100.0 - crisis_flagged as f64 / total as f64 * 100.0).max(0.0)
}

/// Heuristic 0-100 composite of consistency, mood, therapeutic work and goal
/// progress. Each part contributes at most 25 points. Advisory, not diagnostic.
pub fn emotional_growth_score(
    longest_streak: u32,
    average_mood: f64,
    therapeutic_count: usize,
    progress_to_goal: f64,
) -> f64 {
    let streak_part = f64::from(longest_streak.min(30)) / 30.0 * 25.0;
    let mood_part = (average_mood / 10.0).clamp(0.0, 1.0) * 25.0;
    let therapeutic_part = therapeutic_count.min(20) as f64 / 20.0 * 25.0;
    let goal_part = progress_to_goal.clamp(0.0, 100.0) * 0.25;
    (streak_part + mood_part + therapeutic_part + goal_part)
        .round()
        .clamp(0.0, 100.0)
}
