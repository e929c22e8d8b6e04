//! End-to-end tests for the reflection store
//!
//! Exercise the store through its public API: aggregation, crisis handling,
//! goals, filtering, snapshot round-trips and export/import.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

use reflection_engine::config::EngineSettings;
use reflection_engine::error::{EngineError, EscalationError, EscalationResult};
use reflection_engine::model::{
    Category, Goal, GoalFrequency, InsightType, ReflectionDraft, Severity,
};
use reflection_engine::query::{ReflectionFilter, SortKey, SortSpec};
use reflection_engine::safety::EscalationHook;
use reflection_engine::store::{EscalationStatus, ExportFormat, ReflectionStore};

/// Escalation hook that records every request and optionally fails.
#[derive(Default)]
struct RecordingHook {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl EscalationHook for RecordingHook {
    async fn request_escalation(&self, reflection_id: &str) -> EscalationResult<()> {
        self.calls.lock().unwrap().push(reflection_id.to_string());
        if self.fail {
            return Err(EscalationError::Failed {
                reflection_id: reflection_id.to_string(),
                message: "hotline unreachable".to_string(),
            });
        }
        Ok(())
    }
}

fn create_store() -> ReflectionStore {
    ReflectionStore::new(EngineSettings::default())
}

/// Backdate a reflection relative to a single reference instant.
async fn add_days_before(
    store: &mut ReflectionStore,
    now: DateTime<Utc>,
    days: i64,
    category: Category,
) -> String {
    let at = now - Duration::days(days);
    store
        .add_reflection(
            ReflectionDraft::new("Daily entry", "Some thoughts about the day", category).at(at),
        )
        .await
        .unwrap()
        .reflection
        .id
}

#[cfg(test)]
mod aggregation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_average_mood_is_arithmetic_mean() {
        let mut store = create_store();
        for mood in [6, 8, 7] {
            store
                .add_reflection(
                    ReflectionDraft::new("Check-in", "Noting my mood", Category::General)
                        .with_mood(mood),
                )
                .await
                .unwrap();
        }
        // Reflections without a mood do not count.
        store
            .add_reflection(ReflectionDraft::new("Note", "No mood today", Category::General))
            .await
            .unwrap();

        assert_eq!(store.stats().average_mood, 7.0);
        assert_eq!(store.stats().total_reflections, 4);
    }

    #[tokio::test]
    async fn test_seven_consecutive_days_make_a_streak() {
        let mut store = create_store();
        let now = Utc::now();
        for d in 0..7 {
            add_days_before(&mut store, now, d, Category::Gratitude).await;
        }

        assert_eq!(store.stats().current_streak, 7);
        assert_eq!(store.stats().longest_streak, 7);
    }

    #[tokio::test]
    async fn test_gap_resets_current_streak_but_keeps_longest() {
        let mut store = create_store();
        let now = Utc::now();
        for d in 0..3 {
            add_days_before(&mut store, now, d, Category::Growth).await;
        }
        for d in 4..11 {
            add_days_before(&mut store, now, d, Category::Growth).await;
        }

        assert_eq!(store.stats().current_streak, 3);
        assert_eq!(store.stats().longest_streak, 7);
    }

    #[tokio::test]
    async fn test_no_entry_today_means_no_current_streak() {
        let mut store = create_store();
        let now = Utc::now();
        for d in 1..4 {
            add_days_before(&mut store, now, d, Category::Growth).await;
        }

        assert_eq!(store.stats().current_streak, 0);
        assert_eq!(store.stats().longest_streak, 3);
    }

    #[tokio::test]
    async fn test_delete_decrements_total_and_hides_from_queries() {
        let mut store = create_store();
        let now = Utc::now();
        let keep = add_days_before(&mut store, now, 0, Category::Coping).await;
        let gone = add_days_before(&mut store, now, 1, Category::Coping).await;
        assert_eq!(store.stats().total_reflections, 2);

        assert!(store.remove_reflection(&gone));

        assert_eq!(store.stats().total_reflections, 1);
        let ids: Vec<&str> = store
            .filtered_reflections()
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec![keep.as_str()]);
    }

    #[tokio::test]
    async fn test_goal_progress_daily_frequency() {
        let mut store = create_store();
        let now = Utc::now();
        let goal = store
            .add_goal(
                Goal::new(
                    "Gratitude every day",
                    Category::Gratitude,
                    GoalFrequency::Daily,
                    now - Duration::days(10) - Duration::minutes(5),
                    now + Duration::days(20),
                )
                .unwrap(),
            )
            .unwrap();

        for d in 0..5 {
            add_days_before(&mut store, now, d, Category::Gratitude).await;
        }
        assert_eq!(store.goal(&goal.id).unwrap().progress, 50.0);

        for d in 5..10 {
            add_days_before(&mut store, now, d, Category::Gratitude).await;
        }
        assert_eq!(store.goal(&goal.id).unwrap().progress, 100.0);
    }
}

#[cfg(test)]
mod safety_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_crisis_reflection_always_yields_crisis_insight() {
        let hook = Arc::new(RecordingHook::default());
        let mut store = create_store().with_escalation_hook(hook.clone());
        let now = Utc::now();
        add_days_before(&mut store, now, 2, Category::Gratitude).await;
        let flagged = store
            .add_reflection(ReflectionDraft::new(
                "Late night",
                "Sometimes I think everyone would be better off dead without me",
                Category::Challenges,
            ))
            .await
            .unwrap();

        assert!(flagged.crisis_detected);
        assert_eq!(flagged.escalation, EscalationStatus::Requested);
        assert_eq!(*hook.calls.lock().unwrap(), vec![flagged.reflection.id.clone()]);

        store.generate_insights();
        let crisis: Vec<_> = store
            .insights()
            .iter()
            .filter(|i| i.insight_type == InsightType::Concern && i.severity == Some(Severity::Crisis))
            .collect();
        assert_eq!(crisis.len(), 1);
        assert!(crisis[0]
            .supporting_data
            .iter()
            .any(|d| d.contains(&flagged.reflection.id)));
        // Crisis insights rank first.
        assert!(store.insights()[0].is_crisis());
    }

    #[tokio::test]
    async fn test_failed_escalation_keeps_reflection_and_surfaces_warning() {
        let hook = Arc::new(RecordingHook {
            fail: true,
            ..Default::default()
        });
        let mut store = create_store().with_escalation_hook(hook.clone());
        let now = Utc::now();

        let outcome = store
            .add_reflection(ReflectionDraft::new(
                "Hard day",
                "I want to die",
                Category::Crisis,
            ))
            .await
            .unwrap();

        assert!(matches!(outcome.escalation, EscalationStatus::Failed(_)));
        assert_eq!(store.len(), 1);
        let err = store.current_error().cloned().unwrap();
        assert!(matches!(err, EngineError::Escalation(_)));
        assert!(err.is_recoverable());

        // A prior error does not block unrelated mutations.
        add_days_before(&mut store, now, 0, Category::Gratitude).await;
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_safe_content_is_not_escalated() {
        let hook = Arc::new(RecordingHook::default());
        let mut store = create_store().with_escalation_hook(hook.clone());

        let outcome = store
            .add_reflection(ReflectionDraft::new(
                "Good day",
                "I had a great day",
                Category::Gratitude,
            ))
            .await
            .unwrap();

        assert!(!outcome.crisis_detected);
        assert!(outcome.reflection.metadata.crisis_safe);
        assert!(hook.calls.lock().unwrap().is_empty());
    }
}

#[cfg(test)]
mod query_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_tag_filter_returns_exact_subset() {
        let mut store = create_store();
        let sleep = store
            .add_reflection(
                ReflectionDraft::new("Rest", "Slept nine hours", Category::General)
                    .with_tags(["sleep"]),
            )
            .await
            .unwrap()
            .reflection
            .id;
        store
            .add_reflection(
                ReflectionDraft::new("Feelings", "Up and down", Category::General)
                    .with_tags(["mood"]),
            )
            .await
            .unwrap();

        store.set_filter(ReflectionFilter::new().with_tags(["sleep"]));
        let ids: Vec<String> = store
            .filtered_reflections()
            .into_iter()
            .map(|r| r.id.clone())
            .collect();

        assert_eq!(ids, vec![sleep]);

        store.clear_filter();
        assert_eq!(store.filtered_reflections().len(), 2);
    }

    #[tokio::test]
    async fn test_sort_by_mood_ascending() {
        let mut store = create_store();
        for mood in [5, 2, 9] {
            store
                .add_reflection(
                    ReflectionDraft::new("Mood", "Tracking", Category::General).with_mood(mood),
                )
                .await
                .unwrap();
        }

        store.set_sort(SortSpec::ascending(SortKey::Mood));
        let moods: Vec<Option<u8>> = store.filtered_reflections().iter().map(|r| r.mood).collect();

        assert_eq!(moods, vec![Some(2), Some(5), Some(9)]);
    }
}

#[cfg(test)]
mod persistence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_serialize_restore_round_trip() {
        let mut store = create_store();
        let now = Utc::now();
        for d in 0..4 {
            add_days_before(&mut store, now, d, Category::Mindfulness).await;
        }
        store
            .add_goal(
                Goal::new(
                    "Weekly calm",
                    Category::Mindfulness,
                    GoalFrequency::Weekly,
                    now - Duration::days(14),
                    now + Duration::days(14),
                )
                .unwrap(),
            )
            .unwrap();
        store.generate_insights();

        let blob = store.serialize().unwrap();
        let mut restored = create_store();
        restored.restore(&blob).unwrap();

        let before = store.snapshot();
        let after = restored.snapshot();
        assert_eq!(after.reflections, before.reflections);
        assert_eq!(after.goals, before.goals);
        assert_eq!(after.stats, before.stats);
        assert_eq!(after.insights, before.insights);

        // Serializing the restored store reproduces the same blob.
        assert_eq!(restored.serialize().unwrap(), blob);
    }

    #[tokio::test]
    async fn test_restored_goal_progress_reflects_entries() {
        let mut store = create_store();
        let now = Utc::now();
        let goal = store
            .add_goal(
                Goal::new(
                    "Daily gratitude",
                    Category::Gratitude,
                    GoalFrequency::Daily,
                    now - Duration::days(4) - Duration::hours(1),
                    now + Duration::days(30),
                )
                .unwrap(),
            )
            .unwrap();
        for d in 0..2 {
            add_days_before(&mut store, now, d, Category::Gratitude).await;
        }
        assert_eq!(store.goal(&goal.id).unwrap().progress, 50.0);

        let mut snapshot = store.snapshot();
        snapshot.goals[0].progress = 3.0;
        let blob = serde_json::to_vec(&snapshot).unwrap();

        let restored = ReflectionStore::from_blob(EngineSettings::default(), &blob).unwrap();
        assert_eq!(restored.goal(&goal.id).unwrap().progress, 50.0);
    }

    #[tokio::test]
    async fn test_restore_rejects_wrong_shape() {
        let mut store = create_store();
        let result = store.restore(br#"{"reflections": "nope"}"#);

        assert!(matches!(result, Err(EngineError::Serialization { .. })));
        assert!(store.is_empty());
    }
}

#[cfg(test)]
mod exchange_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_csv_export_escapes_fields() {
        let mut store = create_store();
        store
            .add_reflection(
                ReflectionDraft::new(
                    "Lists, lists",
                    "She said \"enough\"\nand left",
                    Category::Relationships,
                )
                .with_tags(["family", "talk"]),
            )
            .await
            .unwrap();

        let csv = String::from_utf8(store.export(ExportFormat::Csv, None).unwrap()).unwrap();

        assert!(csv.starts_with("id,title,content,category,mood,tags,"));
        assert!(csv.contains("\"Lists, lists\""));
        assert!(csv.contains("\"She said \"\"enough\"\"\nand left\""));
        assert!(csv.contains(",relationships,,family;talk,"));
    }

    #[tokio::test]
    async fn test_json_export_honours_filter() {
        let mut store = create_store();
        let now = Utc::now();
        add_days_before(&mut store, now, 0, Category::Therapy).await;
        add_days_before(&mut store, now, 1, Category::Goals).await;

        let filter = ReflectionFilter::new().with_categories([Category::Therapy]);
        let bytes = store.export(ExportFormat::Json, Some(&filter)).unwrap();
        let exported: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0]["category"], "therapy");
    }

    #[tokio::test]
    async fn test_import_skips_malformed_and_duplicate_records() {
        let mut store = create_store();
        let records = vec![
            json!({
                "id": "imported-1",
                "title": "Old notebook",
                "content": "Grateful for my sister",
                "category": "gratitude",
                "timestamp": "2024-01-05T09:00:00Z",
                "mood": 8,
            }),
            json!({
                "id": "imported-2",
                "title": "Missing content",
                "category": "growth",
                "createdAt": "2024-01-06T09:00:00Z",
            }),
            json!({
                "id": "imported-1",
                "title": "Duplicate",
                "content": "Same id again",
                "category": "gratitude",
                "created_at": "2024-01-07T09:00:00Z",
            }),
            json!({
                "id": "imported-3",
                "title": "Dark time",
                "content": "I felt hopeless that winter",
                "category": "challenges",
                "created_at": "2024-01-08T09:00:00Z",
            }),
        ];

        let report = store.import_records(&records);

        assert_eq!(report.accepted, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, 1);
        assert_eq!(store.stats().total_reflections, 2);
        assert!(store.reflection("imported-3").unwrap().is_crisis_flagged());
        assert_eq!(store.reflection("imported-1").unwrap().mood, Some(8));
    }

    #[tokio::test]
    async fn test_export_then_import_into_fresh_store() {
        let mut source = create_store();
        let now = Utc::now();
        for d in 0..3 {
            add_days_before(&mut source, now, d, Category::Progress).await;
        }
        let bytes = source.export(ExportFormat::Json, None).unwrap();

        let mut target = create_store();
        let report = target.import_json(&bytes).unwrap();

        assert_eq!(report.accepted, 3);
        assert_eq!(target.stats().longest_streak, 3);
    }
}
