//! The reflection store: single owner of every entity and of the derived
//! stats.
//!
//! Every successful mutation runs to completion before returning: the record
//! is written, stats are recomputed in full, matching goals are refreshed and
//! change listeners receive the new [`Snapshot`]. Mutations take `&mut self`,
//! so no other write can begin while an escalation call is being awaited.
//!
//! Failed operations record their error in a single current-error slot that
//! callers read with [`ReflectionStore::current_error`] and reset with
//! [`ReflectionStore::clear_error`]. Operations on unknown ids are no-ops that
//! report `None` or `false` and leave the slot alone.

mod exchange;


pub use exchange::{ExportFormat, ImportReport};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analytics::{self, GoalProgress};
use crate::config::EngineSettings;
use crate::error::{EngineError, EngineResult, EscalationError};
use crate::model::{
    Category, Goal, GoalPatch, Insight, Prompt, ReactionKind, Reflection, ReflectionDraft,
    ReflectionPatch, Stats,
};
use crate::prompts::builtin_prompts;
use crate::query::{self, ReflectionFilter, SortSpec};
use crate::safety::{detect_crisis_content, EscalationHook};

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Callback invoked with the new state after each successful mutation.
pub type ChangeListener = Box<dyn Fn(&Snapshot) + Send + Sync>;

/// Therapist sharing and crisis-escalation preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareSettings {
    pub share_with_therapist: bool,
    pub therapist_contact: Option<String>,
    /// Allow private reflections to be shared.
    pub include_private: bool,
    /// Invoke the escalation hook when crisis content is written.
    pub auto_escalate_crisis: bool,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            share_with_therapist: false,
            therapist_contact: None,
            include_private: false,
            auto_escalate_crisis: true,
        }
    }
}

/// Serializable state of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Oldest first.
    pub reflections: Vec<Reflection>,
    pub goals: Vec<Goal>,
    /// Newest first.
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub prompts: Vec<Prompt>,
    pub share_settings: ShareSettings,
    pub stats: Stats,
}

/// What happened to the escalation request for a written reflection.
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationStatus {
    /// The content did not match the crisis screen.
    NotRequired,
    /// Crisis content, but auto-escalation is switched off.
    Disabled,
    /// The hook accepted the request.
    Requested,
    /// The hook failed; the reflection was still saved.
    Failed(EscalationError),
}

/// Result of a successful reflection write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub reflection: Reflection,
    pub crisis_detected: bool,
    pub escalation: EscalationStatus,
}

/// Process-local store for one user's reflections, goals, insights and prompts.
pub struct ReflectionStore {
    settings: EngineSettings,
    reflections: HashMap<String, Reflection>,
    goals: HashMap<String, Goal>,
    insights: Vec<Insight>,
    prompts: Vec<Prompt>,
    share_settings: ShareSettings,
    stats: Stats,
    filter: ReflectionFilter,
    sort: SortSpec,
    selected: Option<String>,
    last_error: Option<EngineError>,
    escalation: Option<Arc<dyn EscalationHook>>,
    listeners: Vec<ChangeListener>,
}

impl std::fmt::Debug for ReflectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReflectionStore")
            .field("reflections", &self.reflections.len())
            .field("goals", &self.goals.len())
            .field("insights", &self.insights.len())
            .field("selected", &self.selected)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl ReflectionStore {
    /// Create an empty store seeded with the built-in prompts.
    pub fn new(settings: EngineSettings) -> Self {
        let share_settings = ShareSettings {
            auto_escalate_crisis: settings.auto_escalate_crisis,
            ..Default::default()
        };
        let stats = Stats::empty(settings.weekly_goal);
        Self {
            settings,
            reflections: HashMap::new(),
            goals: HashMap::new(),
            insights: Vec::new(),
            prompts: builtin_prompts(),
            share_settings,
            stats,
            filter: ReflectionFilter::default(),
            sort: SortSpec::default(),
            selected: None,
            last_error: None,
            escalation: None,
            listeners: Vec::new(),
        }
    }

    /// Create a store initialised from a serialized snapshot.
    pub fn from_blob(settings: EngineSettings, blob: &[u8]) -> EngineResult<Self> {
        let mut store = Self::new(settings);
        store.restore(blob)?;
        Ok(store)
    }

    /// Attach the emergency-escalation collaborator.
    pub fn with_escalation_hook(mut self, hook: Arc<dyn EscalationHook>) -> Self {
        self.escalation = Some(hook);
        self
    }

    pub fn set_escalation_hook(&mut self, hook: Arc<dyn EscalationHook>) {
        self.escalation = Some(hook);
    }

    /// Register a listener called after every successful mutation.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Drop all data and return to the freshly constructed state.
    ///
    /// The escalation hook and change listeners stay registered.
    pub fn reset(&mut self) {
        self.reflections.clear();
        self.goals.clear();
        self.insights.clear();
        self.prompts = builtin_prompts();
        self.share_settings = ShareSettings {
            auto_escalate_crisis: self.settings.auto_escalate_crisis,
            ..Default::default()
        };
        self.filter = ReflectionFilter::default();
        self.sort = SortSpec::default();
        self.selected = None;
        self.last_error = None;
        self.stats = Stats::empty(self.settings.weekly_goal);
        info!("Reflection store reset");
        self.notify();
    }

    // ========================================================================
    // Error slot
    // ========================================================================

    /// The most recent engine error, if not yet cleared.
    pub fn current_error(&self) -> Option<&EngineError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn record(&mut self, err: EngineError) -> EngineError {
        warn!(error = %err, "Engine operation failed");
        self.last_error = Some(err.clone());
        err
    }

    // ========================================================================
    // Reflections
    // ========================================================================

    /// Screen, store and aggregate a new reflection.
    ///
    /// Crisis content is flagged before the write; when auto-escalation is on,
    /// the escalation hook runs before the write completes. A failing hook
    /// never loses the reflection: the failure is reported in the outcome and
    /// in the error slot.
    pub async fn add_reflection(&mut self, draft: ReflectionDraft) -> EngineResult<WriteOutcome> {
        let now = Utc::now();
        let mut reflection = match Reflection::from_draft(draft, now) {
            Ok(r) => r,
            Err(e) => return Err(self.record(e)),
        };

        let crisis_detected = screen(&reflection);
        if crisis_detected {
            reflection.metadata.crisis_safe = false;
        }
        let escalation = if crisis_detected {
            self.escalate(&reflection.id).await
        } else {
            EscalationStatus::NotRequired
        };

        let category = reflection.category;
        info!(
            reflection_id = %reflection.id,
            category = %category,
            words = reflection.word_count,
            crisis = crisis_detected,
            "Reflection added"
        );
        self.reflections
            .insert(reflection.id.clone(), reflection.clone());
        self.after_reflection_change(&[category]);

        Ok(WriteOutcome {
            reflection,
            crisis_detected,
            escalation,
        })
    }

    /// Merge a patch into an existing reflection.
    ///
    /// Returns `Ok(None)` when the id is unknown. The record is replaced only
    /// if the whole patch validates. A reflection already flagged by the
    /// crisis screen stays flagged after edits.
    pub async fn update_reflection(
        &mut self,
        id: &str,
        patch: ReflectionPatch,
    ) -> EngineResult<Option<WriteOutcome>> {
        let Some(existing) = self.reflections.get(id) else {
            debug!(reflection_id = %id, "Update ignored: reflection not found");
            return Ok(None);
        };

        let old_category = existing.category;
        let was_flagged = existing.is_crisis_flagged();
        let touches_text = patch.touches_text();
        let mut updated = existing.clone();
        if let Err(e) = updated.apply_patch(patch, Utc::now()) {
            return Err(self.record(e));
        }

        let newly_flagged = touches_text && !was_flagged && screen(&updated);
        if newly_flagged {
            updated.metadata.crisis_safe = false;
        }
        let escalation = if newly_flagged {
            self.escalate(&updated.id).await
        } else {
            EscalationStatus::NotRequired
        };

        info!(reflection_id = %id, crisis = newly_flagged, "Reflection updated");
        let new_category = updated.category;
        self.reflections.insert(updated.id.clone(), updated.clone());
        self.after_reflection_change(&[old_category, new_category]);

        Ok(Some(WriteOutcome {
            reflection: updated,
            crisis_detected: newly_flagged,
            escalation,
        }))
    }

    /// Delete a reflection. Returns false when the id is unknown.
    pub fn remove_reflection(&mut self, id: &str) -> bool {
        let Some(removed) = self.reflections.remove(id) else {
            debug!(reflection_id = %id, "Remove ignored: reflection not found");
            return false;
        };
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        info!(reflection_id = %id, "Reflection removed");
        self.after_reflection_change(&[removed.category]);
        true
    }

    pub fn reflection(&self, id: &str) -> Option<&Reflection> {
        self.reflections.get(id)
    }

    /// All reflections, newest first.
    pub fn reflections(&self) -> Vec<&Reflection> {
        let mut all: Vec<&Reflection> = self.reflections.values().collect();
        query::sort_reflections(&mut all, &SortSpec::default());
        all
    }

    pub fn len(&self) -> usize {
        self.reflections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflections.is_empty()
    }

    /// Increment one reaction counter. Returns the new count.
    pub fn react(&mut self, id: &str, kind: ReactionKind) -> Option<u32> {
        let count = self.reflections.get_mut(id)?.reactions.bump(kind);
        self.notify();
        Some(count)
    }

    // ========================================================================
    // Selection and stored query
    // ========================================================================

    pub fn select_reflection(&mut self, id: &str) -> bool {
        if self.reflections.contains_key(id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected_reflection(&self) -> Option<&Reflection> {
        self.selected.as_deref().and_then(|id| self.reflections.get(id))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn set_filter(&mut self, filter: ReflectionFilter) {
        self.filter = filter;
    }

    pub fn clear_filter(&mut self) {
        self.filter = ReflectionFilter::default();
    }

    pub fn filter(&self) -> &ReflectionFilter {
        &self.filter
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort
    }

    /// Reflections matching the stored filter, in the stored sort order.
    pub fn filtered_reflections(&self) -> Vec<&Reflection> {
        query::query_reflections(self.reflections.values(), &self.filter, &self.sort)
    }

    /// Ad-hoc query that leaves the stored filter untouched.
    pub fn query(&self, filter: &ReflectionFilter, sort: &SortSpec) -> Vec<&Reflection> {
        query::query_reflections(self.reflections.values(), filter, sort)
    }

    // ========================================================================
    // Stats
    // ========================================================================

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Force a full stats recompute (e.g. after midnight rolls the streak).
    pub fn recompute_stats(&mut self) -> &Stats {
        self.stats = analytics::recompute_stats(self.reflections.values(), &self.settings, Utc::now());
        &self.stats
    }

    // ========================================================================
    // Goals
    // ========================================================================

    /// Store a goal and compute its initial progress.
    pub fn add_goal(&mut self, mut goal: Goal) -> EngineResult<Goal> {
        if goal.target_date <= goal.start_date {
            return Err(self.record(EngineError::validation(
                "target_date",
                "must be after start_date",
            )));
        }
        if self.goals.contains_key(&goal.id) {
            return Err(self.record(EngineError::validation("id", "goal already exists")));
        }
        analytics::update_goal_progress(&mut goal, self.reflections.values(), Utc::now());
        info!(goal_id = %goal.id, category = %goal.category, "Goal added");
        self.goals.insert(goal.id.clone(), goal.clone());
        self.notify();
        Ok(goal)
    }

    /// Merge a goal patch. Returns `Ok(None)` when the id is unknown.
    pub fn update_goal(&mut self, id: &str, patch: GoalPatch) -> EngineResult<Option<Goal>> {
        let Some(mut goal) = self.goals.get(id).cloned() else {
            return Ok(None);
        };
        if let Err(e) = patch.validate(&goal) {
            return Err(self.record(e));
        }

        if let Some(title) = patch.title {
            goal.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            goal.description = description;
        }
        if let Some(frequency) = patch.target_frequency {
            goal.target_frequency = frequency;
        }
        if let Some(active) = patch.is_active {
            goal.is_active = active;
        }
        if let Some(target) = patch.target_date {
            goal.target_date = target;
        }
        analytics::update_goal_progress(&mut goal, self.reflections.values(), Utc::now());

        self.goals.insert(goal.id.clone(), goal.clone());
        self.notify();
        Ok(Some(goal))
    }

    pub fn remove_goal(&mut self, id: &str) -> bool {
        if self.goals.remove(id).is_none() {
            return false;
        }
        info!(goal_id = %id, "Goal removed");
        self.notify();
        true
    }

    pub fn goal(&self, id: &str) -> Option<&Goal> {
        self.goals.get(id)
    }

    /// All goals ordered by start date.
    pub fn goals(&self) -> Vec<&Goal> {
        let mut goals: Vec<&Goal> = self.goals.values().collect();
        goals.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
        goals
    }

    /// Detailed progress breakdown for one goal.
    pub fn goal_progress(&self, id: &str) -> Option<GoalProgress> {
        let goal = self.goals.get(id)?;
        Some(analytics::goal_progress(goal, self.reflections.values(), Utc::now()))
    }

    /// Recompute progress for every active goal.
    pub fn refresh_goals(&mut self) {
        let now = Utc::now();
        for goal in self.goals.values_mut() {
            analytics::update_goal_progress(goal, self.reflections.values(), now);
        }
        self.notify();
    }

    // ========================================================================
    // Insights
    // ========================================================================

    /// Run the insight rules and fold the results into the retained list.
    ///
    /// Returns only the insights produced by this run.
    pub fn generate_insights(&mut self) -> Vec<Insight> {
        let fresh = analytics::generate_insights(
            self.reflections.values(),
            &self.stats,
            &self.settings,
            Utc::now(),
        );
        let existing = std::mem::take(&mut self.insights);
        self.insights =
            analytics::merge_insights(existing, fresh.clone(), self.settings.insight_capacity);
        self.notify();
        fresh
    }

    /// Retained insights, newest first.
    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    pub fn dismiss_insight(&mut self, id: &str) -> bool {
        let before = self.insights.len();
        self.insights.retain(|i| i.id != id);
        let removed = self.insights.len() != before;
        if removed {
            self.notify();
        }
        removed
    }

    pub fn clear_insights(&mut self) {
        self.insights.clear();
        self.notify();
    }

    // ========================================================================
    // Prompts
    // ========================================================================

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn prompt(&self, id: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn prompts_for_category(&self, category: Category) -> Vec<&Prompt> {
        self.prompts
            .iter()
            .filter(|p| p.category == category)
            .collect()
    }

    pub fn add_prompt(&mut self, prompt: Prompt) -> EngineResult<Prompt> {
        if prompt.text.trim().is_empty() {
            return Err(self.record(EngineError::validation("text", "cannot be empty")));
        }
        if self.prompt(&prompt.id).is_some() {
            return Err(self.record(EngineError::validation("id", "prompt already exists")));
        }
        self.prompts.push(prompt.clone());
        self.notify();
        Ok(prompt)
    }

    pub fn remove_prompt(&mut self, id: &str) -> bool {
        let before = self.prompts.len();
        self.prompts.retain(|p| p.id != id);
        let removed = self.prompts.len() != before;
        if removed {
            self.notify();
        }
        removed
    }

    // ========================================================================
    // Sharing
    // ========================================================================

    pub fn share_settings(&self) -> &ShareSettings {
        &self.share_settings
    }

    pub fn update_share_settings(&mut self, settings: ShareSettings) {
        self.share_settings = settings;
        self.notify();
    }

    /// Mark reflections as shared with the therapist.
    ///
    /// Private reflections are skipped unless `include_private` is set.
    /// Returns how many reflections were marked.
    pub fn share_with_therapist(&mut self, ids: &[&str]) -> usize {
        if !self.share_settings.share_with_therapist {
            debug!("Therapist sharing disabled; nothing shared");
            return 0;
        }
        let include_private = self.share_settings.include_private;
        let mut marked = 0;
        for id in ids {
            if let Some(reflection) = self.reflections.get_mut(*id) {
                if reflection.is_private && !include_private {
                    continue;
                }
                if !reflection.metadata.therapist_shared {
                    reflection.metadata.therapist_shared = true;
                    marked += 1;
                }
            }
        }
        if marked > 0 {
            info!(count = marked, "Reflections shared with therapist");
            self.notify();
        }
        marked
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Structured copy of the persistent state.
    pub fn snapshot(&self) -> Snapshot {
        let mut reflections: Vec<Reflection> = self.reflections.values().cloned().collect();
        reflections.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Snapshot {
            version: SNAPSHOT_VERSION,
            reflections,
            goals: self.goals().into_iter().cloned().collect(),
            insights: self.insights.clone(),
            prompts: self.prompts.clone(),
            share_settings: self.share_settings.clone(),
            stats: self.stats.clone(),
        }
    }

    /// Serialize the persistent state to an opaque blob.
    pub fn serialize(&self) -> EngineResult<Vec<u8>> {
        serde_json::to_vec(&self.snapshot()).map_err(EngineError::from)
    }

    /// Replace the store's state with a previously serialized blob.
    ///
    /// The blob is fully validated before anything is replaced; on error the
    /// store is unchanged.
    pub fn restore(&mut self, blob: &[u8]) -> EngineResult<()> {
        let snapshot: Snapshot = match serde_json::from_slice(blob) {
            Ok(s) => s,
            Err(e) => return Err(self.record(e.into())),
        };
        if let Err(e) = validate_snapshot(&snapshot) {
            return Err(self.record(e));
        }
        let Snapshot {
            reflections,
            goals,
            insights,
            prompts,
            share_settings,
            ..
        } = snapshot;

        self.reflections = reflections
            .into_iter()
            .map(|mut r| {
                r.refresh_derived();
                (r.id.clone(), r)
            })
            .collect();
        let now = Utc::now();
        self.goals = goals
            .into_iter()
            .map(|mut g| {
                analytics::update_goal_progress(&mut g, self.reflections.values(), now);
                (g.id.clone(), g)
            })
            .collect();
        self.insights = insights;
        self.insights.truncate(self.settings.insight_capacity);
        self.prompts = if prompts.is_empty() {
            builtin_prompts()
        } else {
            prompts
        };
        self.share_settings = share_settings;
        self.selected = None;
        self.stats = analytics::recompute_stats(self.reflections.values(), &self.settings, now);

        info!(
            reflections = self.reflections.len(),
            goals = self.goals.len(),
            "Store restored from snapshot"
        );
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn escalate(&mut self, reflection_id: &str) -> EscalationStatus {
        if !self.share_settings.auto_escalate_crisis {
            info!(reflection_id = %reflection_id, "Crisis content flagged; auto-escalation disabled");
            return EscalationStatus::Disabled;
        }
        let Some(hook) = self.escalation.clone() else {
            let err = EscalationError::Unavailable {
                message: "no escalation hook configured".to_string(),
            };
            self.record(err.clone().into());
            return EscalationStatus::Failed(err);
        };

        match hook.request_escalation(reflection_id).await {
            Ok(()) => {
                info!(reflection_id = %reflection_id, "Crisis escalation requested");
                EscalationStatus::Requested
            }
            Err(err) => {
                self.record(err.clone().into());
                EscalationStatus::Failed(err)
            }
        }
    }

    fn after_reflection_change(&mut self, categories: &[Category]) {
        let now = Utc::now();
        self.stats = analytics::recompute_stats(self.reflections.values(), &self.settings, now);
        for goal in self.goals.values_mut() {
            if categories.contains(&goal.category) {
                analytics::update_goal_progress(goal, self.reflections.values(), now);
            }
        }
        self.notify();
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for listener in &self.listeners {
            listener(&snapshot);
        }
    }
}

/// Run the crisis screen over the text a reflection carries.
fn screen(reflection: &Reflection) -> bool {
    detect_crisis_content(&reflection.title) || detect_crisis_content(&reflection.content)
}

fn validate_snapshot(snapshot: &Snapshot) -> EngineResult<()> {
    if snapshot.version == 0 || snapshot.version > SNAPSHOT_VERSION {
        return Err(EngineError::Serialization {
            message: format!("unsupported snapshot version {}", snapshot.version),
        });
    }

    let mut seen = HashSet::new();
    for reflection in &snapshot.reflections {
        if reflection.id.trim().is_empty() || !seen.insert(reflection.id.as_str()) {
            return Err(EngineError::Serialization {
                message: format!("duplicate or empty reflection id '{}'", reflection.id),
            });
        }
        if reflection.title.trim().is_empty() || reflection.content.trim().is_empty() {
            return Err(EngineError::Serialization {
                message: format!("reflection {} has an empty title or content", reflection.id),
            });
        }
        let scales = [
            ("mood", reflection.mood),
            ("energy_level", reflection.metadata.energy_level),
            ("stress_level", reflection.metadata.stress_level),
        ];
        if let Some((field, _)) = scales
            .iter()
            .find(|(_, v)| v.is_some_and(|v| !(1..=10).contains(&v)))
        {
            return Err(EngineError::Serialization {
                message: format!("reflection {} has an out-of-range {}", reflection.id, field),
            });
        }
    }

    let goal_ids: BTreeSet<&str> = snapshot.goals.iter().map(|g| g.id.as_str()).collect();
    if goal_ids.len() != snapshot.goals.len() {
        return Err(EngineError::Serialization {
            message: "duplicate goal id".to_string(),
        });
    }
    if let Some(goal) = snapshot.goals.iter().find(|g| g.target_date <= g.start_date) {
        return Err(EngineError::Serialization {
            message: format!("goal {} ends before it starts", goal.id),
        });
    }
    Ok(())
}
