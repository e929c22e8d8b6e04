//! Rule-based insight generation.
//!
//! Insights are derived on demand from the current [`Stats`] and the
//! reflection set. Each rule emits at most one insight per run.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::EngineSettings;
use crate::model::{Category, Insight, InsightType, Reflection, Severity, Stats, TrendDirection};

/// Streak length that earns a consistency insight.
pub const STREAK_INSIGHT_DAYS: u32 = 7;

/// Average mood below which a declining trend is reported as high severity.
pub const LOW_MOOD_THRESHOLD: f64 = 4.0;

/// Category share above which the collection is considered unbalanced.
pub const CATEGORY_IMBALANCE_SHARE: f64 = 0.5;

/// Week-over-week mood change large enough to call out.
pub const WEEKLY_SHIFT_THRESHOLD: f64 = 1.0;

/// Reflections with insight notes needed for a therapeutic insight.
pub const THERAPEUTIC_NOTES_MIN: usize = 3;

/// Run every rule and return the new insights, most urgent first.
pub fn generate_insights<'a, I>(
    reflections: I,
    stats: &Stats,
    settings: &EngineSettings,
    now: DateTime<Utc>,
) -> Vec<Insight>
where
    I: IntoIterator<Item = &'a Reflection>,
{
    let reflections: Vec<&Reflection> = reflections.into_iter().collect();
    let mut insights = Vec::new();

    if let Some(insight) = crisis_insight(&reflections, now) {
        insights.push(insight);
    }
    if let Some(insight) = mood_insight(stats, settings, now) {
        insights.push(insight);
    }
    if let Some(insight) = streak_insight(stats, now) {
        insights.push(insight);
    }
    if let Some(insight) = balance_insight(stats, now) {
        insights.push(insight);
    }
    if let Some(insight) = weekly_shift_insight(stats, now) {
        insights.push(insight);
    }
    if let Some(insight) = goal_insight(stats, now) {
        insights.push(insight);
    }
    if let Some(insight) = therapeutic_insight(stats, now) {
        insights.push(insight);
    }

    rank_insights(&mut insights);
    info!(count = insights.len(), "Generated insights");
    insights
}

/// Order by severity (most urgent first), then confidence.
pub fn rank_insights(insights: &mut [Insight]) {
    insights.sort_by(|a, b| {
        b.severity.cmp(&a.severity).then_with(|| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
}

/// Prepend new insights to the retained list and keep the newest `capacity`.
pub fn merge_insights(existing: Vec<Insight>, new: Vec<Insight>, capacity: usize) -> Vec<Insight> {
    let mut merged = new;
    merged.extend(existing);
    merged.truncate(capacity);
    merged
}

fn crisis_insight(reflections: &[&Reflection], now: DateTime<Utc>) -> Option<Insight> {
    let mut flagged: Vec<&Reflection> = reflections
        .iter()
        .copied()
        .filter(|r| r.is_crisis_flagged())
        .collect();
    if flagged.is_empty() {
        return None;
    }
    flagged.sort_by_key(|r| r.created_at);
    warn!(count = flagged.len(), "Crisis-flagged reflections present");

    let mut insight = Insight::new(
        InsightType::Concern,
        "Some entries may need support",
        format!(
            "{} reflection{} contained language that can signal crisis. You don't have to handle this alone.",
            flagged.len(),
            if flagged.len() == 1 { "" } else { "s" }
        ),
        0.95,
        now,
    )
    .with_severity(Severity::Crisis)
    .with_recommendation("Contact a crisis line or emergency services if you are in danger")
    .with_recommendation("Reach out to someone you trust or to your therapist")
    .with_therapeutic_relevance(10);
    for reflection in flagged {
        insight = insight.with_support(reflection.id.clone());
    }
    Some(insight)
}

fn mood_insight(stats: &Stats, settings: &EngineSettings, now: DateTime<Utc>) -> Option<Insight> {
    let trend = &stats.mood_trend;
    match trend.direction {
        TrendDirection::Improving => Some(
            Insight::new(
                InsightType::Growth,
                "Your mood is improving",
                format!(
                    "Recent entries average {:.1} points higher than earlier ones.",
                    trend.monthly_change
                ),
                0.85,
                now,
            )
            .with_support(format!("average mood {:.1}", trend.average))
            .with_support(format!("change {:+.1}", trend.monthly_change))
            .with_recommendation("Note what has been helping so you can return to it"),
        ),
        TrendDirection::Declining => {
            let severity = if stats.average_mood < settings.crisis_mood_threshold {
                Severity::Crisis
            } else if stats.average_mood < LOW_MOOD_THRESHOLD {
                Severity::High
            } else {
                Severity::Medium
            };
            Some(
                Insight::new(
                    InsightType::Concern,
                    "Your mood has been declining",
                    format!(
                        "Recent entries average {:.1} points lower than earlier ones.",
                        -trend.monthly_change
                    ),
                    0.8,
                    now,
                )
                .with_severity(severity)
                .with_support(format!("average mood {:.1}", stats.average_mood))
                .with_support(format!("change {:+.1}", trend.monthly_change))
                .with_recommendation("Consider talking this through with someone you trust")
                .with_therapeutic_relevance(8),
            )
        }
        TrendDirection::Stable => None,
    }
}

fn streak_insight(stats: &Stats, now: DateTime<Utc>) -> Option<Insight> {
    if stats.current_streak < STREAK_INSIGHT_DAYS {
        return None;
    }
    Some(
        Insight::new(
            InsightType::Pattern,
            "Consistent reflection habit",
            format!(
                "You have reflected {} days in a row.",
                stats.current_streak
            ),
            0.9,
            now,
        )
        .with_support(format!("current streak {}", stats.current_streak))
        .with_support(format!("longest streak {}", stats.longest_streak)),
    )
}

fn balance_insight(stats: &Stats, now: DateTime<Utc>) -> Option<Insight> {
    let category: Category = stats.most_active_category?;
    let count = stats.category_breakdown.get(&category).copied().unwrap_or(0);
    let share = count as f64 / stats.total_reflections.max(1) as f64;
    if share <= CATEGORY_IMBALANCE_SHARE {
        return None;
    }
    Some(
        Insight::new(
            InsightType::Pattern,
            format!("Most entries are about {}", category),
            format!(
                "{:.0}% of your reflections are in the {} category.",
                share * 100.0,
                category
            ),
            0.75,
            now,
        )
        .with_support(format!("{} of {}", count, stats.total_reflections))
        .with_recommendation("Try a prompt from a different category for a fresh angle"),
    )
}

fn weekly_shift_insight(stats: &Stats, now: DateTime<Utc>) -> Option<Insight> {
    let change = stats.mood_trend.weekly_change;
    if change.abs() < WEEKLY_SHIFT_THRESHOLD {
        return None;
    }
    let direction = if change > 0.0 { "up" } else { "down" };
    Some(
        Insight::new(
            InsightType::Trend,
            format!("Mood {} this week", direction),
            format!(
                "This week's average mood moved {:+.1} compared with last week.",
                change
            ),
            0.6,
            now,
        )
        .with_support(format!("weekly change {:+.1}", change)),
    )
}

fn goal_insight(stats: &Stats, now: DateTime<Utc>) -> Option<Insight> {
    if stats.progress_to_goal < 100.0 {
        return None;
    }
    Some(
        Insight::new(
            InsightType::Breakthrough,
            "Weekly goal reached",
            format!(
                "You wrote {} reflections this week, meeting your goal of {}.",
                stats.reflections_this_week, stats.weekly_goal
            ),
            0.8,
            now,
        )
        .with_support(format!("{} this week", stats.reflections_this_week)),
    )
}

fn therapeutic_insight(stats: &Stats, now: DateTime<Utc>) -> Option<Insight> {
    if stats.therapeutic_insights < THERAPEUTIC_NOTES_MIN {
        return None;
    }
    Some(
        Insight::new(
            InsightType::Therapeutic,
            "You are capturing your own insights",
            format!(
                "{} reflections include notes on what you learned about yourself.",
                stats.therapeutic_insights
            ),
            0.7,
            now,
        )
        .with_support(format!("{} annotated reflections", stats.therapeutic_insights))
        .with_recommendation("Consider sharing these notes in your next session")
        .with_therapeutic_relevance(7),
    )
}
