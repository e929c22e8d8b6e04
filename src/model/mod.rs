//! Entity model for reflections, goals, insights, prompts and stats.
//!
//! Records are owned by [`crate::store::ReflectionStore`]. Inputs arrive as
//! drafts and patches; derived fields (word count, reading time, therapeutic
//! value, timestamps) are always computed here and never accepted from callers.

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Average adult silent reading speed used for `reading_time`.
pub const WORDS_PER_MINUTE: u32 = 200;

/// Generate an opaque id: creation timestamp plus a random suffix.
pub fn generate_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Count whitespace-separated words.
pub fn count_words(content: &str) -> u32 {
    content.split_whitespace().count() as u32
}

/// Reading time in whole minutes, rounded up.
pub fn reading_time_minutes(word_count: u32) -> u32 {
    word_count.div_ceil(WORDS_PER_MINUTE)
}

fn check_scale(field: &str, value: Option<u8>) -> EngineResult<()> {
    match value {
        Some(v) if !(1..=10).contains(&v) => Err(EngineError::validation(
            field,
            format!("must be between 1 and 10, got {}", v),
        )),
        _ => Ok(()),
    }
}

fn check_not_blank(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(field, "cannot be empty"));
    }
    Ok(())
}

// ============================================================================
// Enumerations
// ============================================================================

/// Closed set of reflection themes.
///
/// Declaration order is the canonical order used for tie-breaking and for
/// zero-filled category breakdowns.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Gratitude,
    Growth,
    Challenges,
    Relationships,
    Goals,
    Mindfulness,
    Therapy,
    Coping,
    Progress,
    Crisis,
    #[default]
    General,
}

impl Category {
    /// Every category, in canonical order.
    pub const ALL: [Category; 11] = [
        Category::Gratitude,
        Category::Growth,
        Category::Challenges,
        Category::Relationships,
        Category::Goals,
        Category::Mindfulness,
        Category::Therapy,
        Category::Coping,
        Category::Progress,
        Category::Crisis,
        Category::General,
    ];

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Gratitude => "gratitude",
            Category::Growth => "growth",
            Category::Challenges => "challenges",
            Category::Relationships => "relationships",
            Category::Goals => "goals",
            Category::Mindfulness => "mindfulness",
            Category::Therapy => "therapy",
            Category::Coping => "coping",
            Category::Progress => "progress",
            Category::Crisis => "crisis",
            Category::General => "general",
        }
    }

    /// Categories counted towards the therapeutic components of the
    /// heuristic scores.
    pub fn is_therapeutic(&self) -> bool {
        matches!(
            self,
            Category::Therapy | Category::Coping | Category::Growth | Category::Mindfulness
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// How often a goal expects a matching reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalFrequency {
    Daily,
    Weekly,
    BiWeekly,
    Monthly,
}

impl GoalFrequency {
    /// Length of one period in days.
    pub fn period_days(&self) -> i64 {
        match self {
            GoalFrequency::Daily => 1,
            GoalFrequency::Weekly => 7,
            GoalFrequency::BiWeekly => 14,
            GoalFrequency::Monthly => 30,
        }
    }
}

impl std::fmt::Display for GoalFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalFrequency::Daily => write!(f, "daily"),
            GoalFrequency::Weekly => write!(f, "weekly"),
            GoalFrequency::BiWeekly => write!(f, "bi-weekly"),
            GoalFrequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for GoalFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(GoalFrequency::Daily),
            "weekly" => Ok(GoalFrequency::Weekly),
            "bi-weekly" | "biweekly" | "bi_weekly" => Ok(GoalFrequency::BiWeekly),
            "monthly" => Ok(GoalFrequency::Monthly),
            _ => Err(format!("Unknown goal frequency: {}", s)),
        }
    }
}

/// Kind of derived observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Pattern,
    Growth,
    Concern,
    Breakthrough,
    Trend,
    Therapeutic,
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightType::Pattern => write!(f, "pattern"),
            InsightType::Growth => write!(f, "growth"),
            InsightType::Concern => write!(f, "concern"),
            InsightType::Breakthrough => write!(f, "breakthrough"),
            InsightType::Trend => write!(f, "trend"),
            InsightType::Therapeutic => write!(f, "therapeutic"),
        }
    }
}

/// Insight severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Crisis,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Crisis => write!(f, "crisis"),
        }
    }
}

/// Direction of the mood trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Improving => write!(f, "improving"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::Declining => write!(f, "declining"),
        }
    }
}

/// Difficulty of a reflection prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptDifficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// One of the four reaction counters on a reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Helpful,
    Insightful,
    Supportive,
    Relatable,
}

impl std::fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReactionKind::Helpful => write!(f, "helpful"),
            ReactionKind::Insightful => write!(f, "insightful"),
            ReactionKind::Supportive => write!(f, "supportive"),
            ReactionKind::Relatable => write!(f, "relatable"),
        }
    }
}

impl std::str::FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "helpful" => Ok(ReactionKind::Helpful),
            "insightful" => Ok(ReactionKind::Insightful),
            "supportive" => Ok(ReactionKind::Supportive),
            "relatable" => Ok(ReactionKind::Relatable),
            _ => Err(format!("Unknown reaction: {}", s)),
        }
    }
}

// ============================================================================
// Reflection
// ============================================================================

/// Independent reaction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    pub helpful: u32,
    pub insightful: u32,
    pub supportive: u32,
    pub relatable: u32,
}

impl Reactions {
    /// Increment one counter and return its new value.
    pub fn bump(&mut self, kind: ReactionKind) -> u32 {
        let counter = match kind {
            ReactionKind::Helpful => &mut self.helpful,
            ReactionKind::Insightful => &mut self.insightful,
            ReactionKind::Supportive => &mut self.supportive,
            ReactionKind::Relatable => &mut self.relatable,
        };
        *counter = counter.saturating_add(1);
        *counter
    }
}

/// Optional per-reflection wellness data plus the safety flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionMetadata {
    /// Emotional-state tags, e.g. "anxious", "calm".
    #[serde(default)]
    pub emotional_state: Vec<String>,
    /// Energy level (1-10).
    pub energy_level: Option<u8>,
    /// Stress level (1-10).
    pub stress_level: Option<u8>,
    /// Free-text insight notes the author attached.
    #[serde(default)]
    pub insights: Vec<String>,
    /// Derived, advisory score (0-10). Not a clinical measure.
    pub therapeutic_value: u8,
    /// False only when the crisis screen matched the content.
    pub crisis_safe: bool,
    /// Whether this reflection has been shared with a therapist.
    pub therapist_shared: bool,
}

impl Default for ReflectionMetadata {
    fn default() -> Self {
        Self {
            emotional_state: Vec::new(),
            energy_level: None,
            stress_level: None,
            insights: Vec::new(),
            therapeutic_value: 0,
            crisis_safe: true,
            therapist_shared: false,
        }
    }
}

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    /// Unique reflection identifier.
    pub id: String,
    pub title: String,
    pub content: String,
    /// Id of the prompt this reflection answers, if any.
    pub prompt_id: Option<String>,
    /// Prompt text as shown to the author.
    pub prompt: Option<String>,
    pub category: Category,
    /// Mood (1-10).
    pub mood: Option<u8>,
    pub tags: BTreeSet<String>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Reactions,
    pub word_count: u32,
    /// Minutes.
    pub reading_time: u32,
    #[serde(default)]
    pub metadata: ReflectionMetadata,
}

impl Reflection {
    /// Build a reflection from validated draft input.
    ///
    /// The crisis flag starts out safe; the store applies the screen.
    pub fn from_draft(draft: ReflectionDraft, now: DateTime<Utc>) -> EngineResult<Self> {
        draft.validate()?;
        let created_at = draft.created_at.unwrap_or(now);
        let mut reflection = Self {
            id: generate_id(),
            title: draft.title.trim().to_string(),
            content: draft.content,
            prompt_id: draft.prompt_id,
            prompt: draft.prompt,
            category: draft.category,
            mood: draft.mood,
            tags: normalize_tags(draft.tags),
            is_private: draft.is_private,
            created_at,
            updated_at: created_at,
            reactions: Reactions::default(),
            word_count: 0,
            reading_time: 0,
            metadata: ReflectionMetadata {
                emotional_state: draft.emotional_state,
                energy_level: draft.energy_level,
                stress_level: draft.stress_level,
                insights: draft.insights,
                ..Default::default()
            },
        };
        reflection.refresh_derived();
        Ok(reflection)
    }

    /// Merge a patch. Validation happens before any field is touched, so a
    /// rejected patch leaves the record unchanged.
    pub fn apply_patch(&mut self, patch: ReflectionPatch, now: DateTime<Utc>) -> EngineResult<()> {
        patch.validate()?;

        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(mood) = patch.mood {
            self.mood = Some(mood);
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(is_private) = patch.is_private {
            self.is_private = is_private;
        }
        if let Some(states) = patch.emotional_state {
            self.metadata.emotional_state = states;
        }
        if let Some(level) = patch.energy_level {
            self.metadata.energy_level = Some(level);
        }
        if let Some(level) = patch.stress_level {
            self.metadata.stress_level = Some(level);
        }
        if let Some(insights) = patch.insights {
            self.metadata.insights = insights;
        }

        self.updated_at = now.max(self.updated_at);
        self.refresh_derived();
        Ok(())
    }

    /// Recompute word count, reading time and therapeutic value from content.
    pub fn refresh_derived(&mut self) {
        self.word_count = count_words(&self.content);
        self.reading_time = reading_time_minutes(self.word_count);
        self.metadata.therapeutic_value = therapeutic_value(self);
    }

    /// Calendar day (UTC) the reflection belongs to.
    pub fn day(&self) -> chrono::NaiveDate {
        self.created_at.date_naive()
    }

    pub fn is_crisis_flagged(&self) -> bool {
        !self.metadata.crisis_safe
    }
}

/// Heuristic 0-10 score of how much therapeutic work a reflection shows.
///
/// Advisory only; it has no clinical validation.
pub fn therapeutic_value(reflection: &Reflection) -> u8 {
    let mut score = (reflection.word_count / 50).min(4);
    if reflection.category.is_therapeutic() {
        score += 3;
    }
    if reflection.metadata.insights.iter().any(|n| !n.trim().is_empty()) {
        score += 2;
    }
    if !reflection.metadata.emotional_state.is_empty() {
        score += 1;
    }
    score.min(10) as u8
}

fn normalize_tags<I: IntoIterator<Item = String>>(tags: I) -> BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Caller input for a new reflection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflectionDraft {
    pub title: String,
    pub content: String,
    pub category: Category,
    #[serde(default)]
    pub prompt_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub mood: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_private: bool,
    /// Backdate the entry; defaults to now.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub emotional_state: Vec<String>,
    #[serde(default)]
    pub energy_level: Option<u8>,
    #[serde(default)]
    pub stress_level: Option<u8>,
    #[serde(default)]
    pub insights: Vec<String>,
}

impl ReflectionDraft {
    /// Create a new draft with the mandatory fields.
    pub fn new(title: impl Into<String>, content: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category,
            ..Default::default()
        }
    }

    /// Set the mood (1-10)
    pub fn with_mood(mut self, mood: u8) -> Self {
        self.mood = Some(mood);
        self
    }

    /// Set the tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Link the prompt that inspired this reflection
    pub fn with_prompt(mut self, prompt: &Prompt) -> Self {
        self.prompt_id = Some(prompt.id.clone());
        self.prompt = Some(prompt.text.clone());
        self
    }

    /// Mark as private
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Backdate the creation timestamp
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Set emotional-state tags
    pub fn with_emotional_state<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emotional_state = states.into_iter().map(Into::into).collect();
        self
    }

    /// Set energy and stress levels
    pub fn with_levels(mut self, energy: u8, stress: u8) -> Self {
        self.energy_level = Some(energy);
        self.stress_level = Some(stress);
        self
    }

    /// Attach an insight note
    pub fn with_insight(mut self, note: impl Into<String>) -> Self {
        self.insights.push(note.into());
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        check_not_blank("title", &self.title)?;
        check_not_blank("content", &self.content)?;
        check_scale("mood", self.mood)?;
        check_scale("energy_level", self.energy_level)?;
        check_scale("stress_level", self.stress_level)?;
        Ok(())
    }
}

/// Partial update; omitted fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflectionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Category>,
    pub mood: Option<u8>,
    pub tags: Option<Vec<String>>,
    pub is_private: Option<bool>,
    pub emotional_state: Option<Vec<String>>,
    pub energy_level: Option<u8>,
    pub stress_level: Option<u8>,
    pub insights: Option<Vec<String>>,
}

impl ReflectionPatch {
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(title) = &self.title {
            check_not_blank("title", title)?;
        }
        if let Some(content) = &self.content {
            check_not_blank("content", content)?;
        }
        check_scale("mood", self.mood)?;
        check_scale("energy_level", self.energy_level)?;
        check_scale("stress_level", self.stress_level)?;
        Ok(())
    }

    /// Whether applying this patch changes the text the crisis screen reads.
    pub fn touches_text(&self) -> bool {
        self.title.is_some() || self.content.is_some()
    }
}

// ============================================================================
// Goal
// ============================================================================

/// A recurring reflection target within one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub target_frequency: GoalFrequency,
    pub is_active: bool,
    /// Derived percentage (0-100); recomputed by the goal tracker.
    pub progress: f64,
    pub start_date: DateTime<Utc>,
    pub target_date: DateTime<Utc>,
}

impl Goal {
    /// Create a new active goal. `target_date` must be after `start_date`.
    pub fn new(
        title: impl Into<String>,
        category: Category,
        target_frequency: GoalFrequency,
        start_date: DateTime<Utc>,
        target_date: DateTime<Utc>,
    ) -> EngineResult<Self> {
        let title = title.into();
        check_not_blank("title", &title)?;
        if target_date <= start_date {
            return Err(EngineError::validation(
                "target_date",
                "must be after start_date",
            ));
        }
        Ok(Self {
            id: generate_id(),
            title: title.trim().to_string(),
            description: String::new(),
            category,
            target_frequency,
            is_active: true,
            progress: 0.0,
            start_date,
            target_date,
        })
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update for a goal. Progress is never patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_frequency: Option<GoalFrequency>,
    pub is_active: Option<bool>,
    pub target_date: Option<DateTime<Utc>>,
}

impl GoalPatch {
    /// Validate against the goal it will be applied to.
    pub fn validate(&self, goal: &Goal) -> EngineResult<()> {
        if let Some(title) = &self.title {
            check_not_blank("title", title)?;
        }
        if let Some(target) = self.target_date {
            if target <= goal.start_date {
                return Err(EngineError::validation(
                    "target_date",
                    "must be after start_date",
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Insight
// ============================================================================

/// A derived observation produced by the insight generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    /// Confidence (0.0-1.0).
    pub confidence: f64,
    pub supporting_data: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub severity: Option<Severity>,
    /// Relevance to therapy work (0-10).
    pub therapeutic_relevance: Option<u8>,
}

impl Insight {
    /// Create a new insight
    pub fn new(
        insight_type: InsightType,
        title: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_id(),
            insight_type,
            title: title.into(),
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
            supporting_data: Vec::new(),
            recommendations: Vec::new(),
            timestamp,
            severity: None,
            therapeutic_relevance: None,
        }
    }

    /// Set the severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Append a supporting datum
    pub fn with_support(mut self, datum: impl Into<String>) -> Self {
        self.supporting_data.push(datum.into());
        self
    }

    /// Append a recommendation
    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }

    /// Set the therapeutic relevance (clamped to 0-10)
    pub fn with_therapeutic_relevance(mut self, relevance: u8) -> Self {
        self.therapeutic_relevance = Some(relevance.min(10));
        self
    }

    pub fn is_crisis(&self) -> bool {
        self.severity == Some(Severity::Crisis)
    }
}

// ============================================================================
// Prompt
// ============================================================================

/// A writing prompt offered to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub text: String,
    pub category: Category,
    #[serde(default)]
    pub difficulty: PromptDifficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    /// False for the built-in library.
    #[serde(default)]
    pub is_custom: bool,
}

impl Prompt {
    /// Create a user-authored prompt.
    pub fn custom(text: impl Into<String>, category: Category) -> EngineResult<Self> {
        let text = text.into();
        check_not_blank("text", &text)?;
        Ok(Self {
            id: generate_id(),
            text,
            category,
            difficulty: PromptDifficulty::default(),
            tags: Vec::new(),
            is_custom: true,
        })
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Mood movement over the trend window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodTrend {
    pub average: f64,
    pub direction: TrendDirection,
    pub weekly_change: f64,
    pub monthly_change: f64,
}

impl Default for MoodTrend {
    fn default() -> Self {
        Self {
            average: NEUTRAL_MOOD,
            direction: TrendDirection::Stable,
            weekly_change: 0.0,
            monthly_change: 0.0,
        }
    }
}

/// Midpoint of the 1-10 mood scale, used when no moods are recorded.
pub const NEUTRAL_MOOD: f64 = 5.0;

/// Full-recompute snapshot of the reflection collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_reflections: usize,
    pub average_mood: f64,
    pub most_active_category: Option<Category>,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Every category present, zero-filled.
    pub category_breakdown: BTreeMap<Category, usize>,
    pub mood_trend: MoodTrend,
    pub weekly_goal: u32,
    pub reflections_this_week: usize,
    pub progress_to_goal: f64,
    /// Heuristic composite (0-100). Not diagnostic.
    pub emotional_growth_score: f64,
    pub therapeutic_insights: usize,
    /// 100 minus the percentage of crisis-flagged reflections.
    pub crisis_safety_score: f64,
}

impl Stats {
    /// Stats for an empty collection.
    pub fn empty(weekly_goal: u32) -> Self {
        Self {
            total_reflections: 0,
            average_mood: NEUTRAL_MOOD,
            most_active_category: None,
            current_streak: 0,
            longest_streak: 0,
            category_breakdown: Category::ALL.iter().map(|c| (*c, 0)).collect(),
            mood_trend: MoodTrend::default(),
            weekly_goal,
            reflections_this_week: 0,
            progress_to_goal: 0.0,
            emotional_growth_score: 0.0,
            therapeutic_insights: 0,
            crisis_safety_score: 100.0,
        }
    }
}
