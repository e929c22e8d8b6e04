//! Unit tests for entity types: validation, derived fields, builders and
//! enum string forms.

use super::*;
use chrono::Duration;

// ============================================================================
// Derived text fields
// ============================================================================

#[test]
fn test_count_words_ignores_extra_whitespace() {
    assert_eq!(count_words(""), 0);
    assert_eq!(count_words("   "), 0);
    assert_eq!(count_words("one  two\nthree\tfour"), 4);
}

#[test]
fn test_reading_time_rounds_up() {
    assert_eq!(reading_time_minutes(0), 0);
    assert_eq!(reading_time_minutes(1), 1);
    assert_eq!(reading_time_minutes(200), 1);
    assert_eq!(reading_time_minutes(201), 2);
}

#[test]
fn test_generate_id_is_unique() {
    let a = generate_id();
    let b = generate_id();
    assert_ne!(a, b);
    assert!(a.contains('-'));
}

// ============================================================================
// Reflection tests
// ============================================================================

#[test]
fn test_reflection_from_draft_computes_derived_fields() {
    let now = Utc::now();
    let draft = ReflectionDraft::new("Morning", "slept well and went for a walk", Category::Gratitude)
        .with_mood(7)
        .with_tags(["sleep", " walk ", ""]);
    let reflection = Reflection::from_draft(draft, now).unwrap();

    assert!(!reflection.id.is_empty());
    assert_eq!(reflection.word_count, 7);
    assert_eq!(reflection.reading_time, 1);
    assert_eq!(reflection.created_at, now);
    assert_eq!(reflection.updated_at, now);
    assert!(reflection.metadata.crisis_safe);
    assert!(!reflection.metadata.therapist_shared);
    assert_eq!(
        reflection.tags.iter().cloned().collect::<Vec<_>>(),
        vec!["sleep".to_string(), "walk".to_string()]
    );
}

#[test]
fn test_reflection_draft_rejects_blank_title() {
    let draft = ReflectionDraft::new("  ", "content", Category::General);
    let err = Reflection::from_draft(draft, Utc::now()).unwrap_err();
    assert_eq!(err, EngineError::validation("title", "cannot be empty"));
}

#[test]
fn test_reflection_draft_rejects_out_of_range_mood() {
    let draft = ReflectionDraft::new("t", "c", Category::General).with_mood(11);
    let err = Reflection::from_draft(draft, Utc::now()).unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "mood"));

    let draft = ReflectionDraft::new("t", "c", Category::General).with_levels(0, 5);
    assert!(Reflection::from_draft(draft, Utc::now()).is_err());
}

#[test]
fn test_reflection_backdated_draft() {
    let when = Utc::now() - Duration::days(3);
    let draft = ReflectionDraft::new("t", "c", Category::General).at(when);
    let reflection = Reflection::from_draft(draft, Utc::now()).unwrap();
    assert_eq!(reflection.created_at, when);
}

#[test]
fn test_apply_patch_keeps_omitted_fields() {
    let created = Utc::now() - Duration::hours(1);
    let draft = ReflectionDraft::new("Title", "short note", Category::Therapy)
        .with_mood(4)
        .with_tags(["therapy"]);
    let mut reflection = Reflection::from_draft(draft, created).unwrap();

    let patch = ReflectionPatch {
        content: Some("a much longer note about the session today".to_string()),
        ..Default::default()
    };
    let now = Utc::now();
    reflection.apply_patch(patch, now).unwrap();

    assert_eq!(reflection.title, "Title");
    assert_eq!(reflection.mood, Some(4));
    assert_eq!(reflection.category, Category::Therapy);
    assert!(reflection.tags.contains("therapy"));
    assert_eq!(reflection.word_count, 8);
    assert_eq!(reflection.updated_at, now);
    assert_eq!(reflection.created_at, created);
}

#[test]
fn test_apply_invalid_patch_leaves_record_untouched() {
    let mut reflection =
        Reflection::from_draft(ReflectionDraft::new("t", "c", Category::General), Utc::now())
            .unwrap();
    let before = reflection.clone();

    let patch = ReflectionPatch {
        title: Some("new title".to_string()),
        mood: Some(0),
        ..Default::default()
    };
    assert!(reflection.apply_patch(patch, Utc::now()).is_err());
    assert_eq!(reflection, before);
}

#[test]
fn test_updated_at_never_moves_backwards() {
    let now = Utc::now();
    let mut reflection =
        Reflection::from_draft(ReflectionDraft::new("t", "c", Category::General), now).unwrap();
    let earlier = now - Duration::minutes(5);
    reflection
        .apply_patch(
            ReflectionPatch {
                title: Some("x".to_string()),
                ..Default::default()
            },
            earlier,
        )
        .unwrap();
    assert_eq!(reflection.updated_at, now);
}

#[test]
fn test_therapeutic_value_heuristic() {
    let long_text = "word ".repeat(250);
    let draft = ReflectionDraft::new("Session", long_text, Category::Therapy)
        .with_emotional_state(["calm"])
        .with_insight("I notice I avoid conflict");
    let reflection = Reflection::from_draft(draft, Utc::now()).unwrap();
    // 4 (length, capped) + 3 (therapeutic category) + 2 (insight) + 1 (emotion)
    assert_eq!(reflection.metadata.therapeutic_value, 10);

    let plain =
        Reflection::from_draft(ReflectionDraft::new("t", "short", Category::General), Utc::now())
            .unwrap();
    assert_eq!(plain.metadata.therapeutic_value, 0);
}

#[test]
fn test_reactions_bump() {
    let mut reactions = Reactions::default();
    assert_eq!(reactions.bump(ReactionKind::Helpful), 1);
    assert_eq!(reactions.bump(ReactionKind::Helpful), 2);
    assert_eq!(reactions.bump(ReactionKind::Relatable), 1);
    assert_eq!(reactions.insightful, 0);
    assert_eq!(reactions.supportive, 0);
}

// ============================================================================
// Goal tests
// ============================================================================

#[test]
fn test_goal_requires_target_after_start() {
    let start = Utc::now();
    let err = Goal::new("Journal", Category::General, GoalFrequency::Daily, start, start)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "target_date"));

    let goal = Goal::new(
        "Journal",
        Category::General,
        GoalFrequency::Weekly,
        start,
        start + Duration::days(30),
    )
    .unwrap()
    .with_description("write more");
    assert!(goal.is_active);
    assert_eq!(goal.progress, 0.0);
    assert_eq!(goal.description, "write more");
}

#[test]
fn test_goal_patch_validates_against_start() {
    let start = Utc::now();
    let goal = Goal::new(
        "g",
        Category::Coping,
        GoalFrequency::Daily,
        start,
        start + Duration::days(5),
    )
    .unwrap();
    let patch = GoalPatch {
        target_date: Some(start - Duration::days(1)),
        ..Default::default()
    };
    assert!(patch.validate(&goal).is_err());
}

// ============================================================================
// Insight tests
// ============================================================================

#[test]
fn test_insight_confidence_clamp() {
    let high = Insight::new(InsightType::Pattern, "t", "d", 1.5, Utc::now());
    assert_eq!(high.confidence, 1.0);
    let low = Insight::new(InsightType::Pattern, "t", "d", -0.2, Utc::now());
    assert_eq!(low.confidence, 0.0);
}

#[test]
fn test_insight_builders() {
    let insight = Insight::new(InsightType::Concern, "t", "d", 0.9, Utc::now())
        .with_severity(Severity::Crisis)
        .with_support("r-1")
        .with_recommendation("reach out")
        .with_therapeutic_relevance(42);
    assert!(insight.is_crisis());
    assert_eq!(insight.supporting_data, vec!["r-1".to_string()]);
    assert_eq!(insight.recommendations.len(), 1);
    assert_eq!(insight.therapeutic_relevance, Some(10));
}

#[test]
fn test_insight_serializes_type_field() {
    let insight = Insight::new(InsightType::Growth, "t", "d", 0.5, Utc::now());
    let json = serde_json::to_value(&insight).unwrap();
    assert_eq!(json["type"], "growth");
}

// ============================================================================
// Enum tests
// ============================================================================

#[test]
fn test_category_round_trip_strings() {
    for category in Category::ALL {
        let parsed: Category = category.to_string().parse().unwrap();
        assert_eq!(parsed, category);
    }
    assert!("unknown".parse::<Category>().is_err());
    assert_eq!("  Therapy ".parse::<Category>().unwrap(), Category::Therapy);
}

#[test]
fn test_goal_frequency_parse() {
    assert_eq!("bi-weekly".parse::<GoalFrequency>().unwrap(), GoalFrequency::BiWeekly);
    assert_eq!("biweekly".parse::<GoalFrequency>().unwrap(), GoalFrequency::BiWeekly);
    assert_eq!(GoalFrequency::Monthly.period_days(), 30);
    assert_eq!(
        serde_json::to_string(&GoalFrequency::BiWeekly).unwrap(),
        "\"bi-weekly\""
    );
}

#[test]
fn test_severity_ordering() {
    assert!(Severity::Crisis > Severity::High);
    assert!(Severity::High > Severity::Medium);
    assert!(Severity::Medium > Severity::Low);
}

#[test]
fn test_empty_stats_zero_filled() {
    let stats = Stats::empty(7);
    assert_eq!(stats.category_breakdown.len(), Category::ALL.len());
    assert!(stats.category_breakdown.values().all(|v| *v == 0));
    assert_eq!(stats.average_mood, NEUTRAL_MOOD);
    assert_eq!(stats.crisis_safety_score, 100.0);
}

#[test]
fn test_custom_prompt_requires_text() {
    assert!(Prompt::custom("", Category::General).is_err());
    let prompt = Prompt::custom("What helped today?", Category::Coping).unwrap();
    assert!(prompt.is_custom);
}
