//! Command-line interface for the reflection journal.
//!
//! Commands run against a [`ReflectionStore`] that the binary loads from and
//! saves back to snapshot storage. Every command returns a [`CliResult`]
//! rather than printing, so the binary decides where output goes.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};

use crate::error::EngineError;
use crate::model::{
    Category, Goal, GoalFrequency, ReactionKind, Reflection, ReflectionDraft, ReflectionPatch,
    Severity, Stats,
};
use crate::query::{ReflectionFilter, SortDirection, SortKey, SortSpec};
use crate::store::{EscalationStatus, ExportFormat, ReflectionStore};

const RULE: &str = "═══════════════════════════════════════════════════════════════════════════════\n";

/// Personal reflection journal with wellness analytics.
#[derive(Parser, Debug)]
#[command(name = "reflection-engine", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write a new reflection
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,

        #[arg(long, default_value = "general")]
        category: Category,

        /// Mood from 1 to 10
        #[arg(long)]
        mood: Option<u8>,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long)]
        private: bool,

        /// Id of the prompt being answered
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Edit an existing reflection
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        mood: Option<u8>,

        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },

    /// Delete a reflection
    Remove { id: String },

    /// Show one reflection in full
    Show { id: String },

    /// List reflections
    List {
        #[arg(long)]
        category: Vec<Category>,

        /// Match reflections carrying this tag
        #[arg(long)]
        tag: Vec<String>,

        /// Free-text search over title, content and tags
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        mood_min: Option<u8>,

        #[arg(long)]
        mood_max: Option<u8>,

        /// Only reflections flagged by the crisis screen
        #[arg(long)]
        flagged: bool,

        /// timestamp, mood, category, word_count or therapeutic_value
        #[arg(long, default_value = "timestamp")]
        sort: SortKey,

        #[arg(long)]
        ascending: bool,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// React to a reflection
    React {
        id: String,

        /// helpful, insightful, supportive or relatable
        kind: ReactionKind,
    },

    /// Show aggregate statistics
    Stats,

    /// Show retained insights
    Insights {
        /// Run the insight rules before listing
        #[arg(long)]
        generate: bool,
    },

    /// Manage reflection goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },

    /// Browse writing prompts
    Prompts {
        #[arg(long)]
        category: Option<Category>,
    },

    /// Export reflections
    Export {
        #[arg(long, default_value = "json")]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import reflections from a JSON array file
    Import { file: PathBuf },

    /// Delete all data
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

/// Goal subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum GoalCommands {
    /// Create a goal starting now
    Add {
        title: String,

        #[arg(long)]
        category: Category,

        /// daily, weekly, bi-weekly or monthly
        #[arg(long, default_value = "weekly")]
        frequency: GoalFrequency,

        /// Length of the goal in days
        #[arg(long, default_value = "30")]
        days: i64,

        #[arg(long)]
        description: Option<String>,
    },

    /// List goals with their progress
    List,

    /// Delete a goal
    Remove { id: String },
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a CLI command against the store.
pub async fn execute_command(command: Commands, store: &mut ReflectionStore) -> CliResult {
    match command {
        Commands::Add {
            title,
            content,
            category,
            mood,
            tags,
            private,
            prompt,
        } => {
            let mut draft = ReflectionDraft::new(title, content, category).with_tags(tags);
            if let Some(mood) = mood {
                draft = draft.with_mood(mood);
            }
            if private {
                draft = draft.private();
            }
            if let Some(prompt_id) = prompt {
                match store.prompt(&prompt_id) {
                    Some(p) => draft = draft.with_prompt(p),
                    None => return not_found("Prompt", prompt_id),
                }
            }
            execute_add(store, draft).await
        }
        Commands::Edit {
            id,
            title,
            content,
            category,
            mood,
            tags,
        } => {
            let patch = ReflectionPatch {
                title,
                content,
                category,
                mood,
                tags,
                ..Default::default()
            };
            match store.update_reflection(&id, patch).await {
                Ok(Some(outcome)) => {
                    let mut out = format!("Updated {}\n", outcome.reflection.id);
                    out.push_str(&escalation_notice(&outcome.escalation));
                    CliResult::success(out)
                }
                Ok(None) => not_found("Reflection", id),
                Err(e) => CliResult::error(format!("Edit failed: {}", e)),
            }
        }
        Commands::Remove { id } => {
            if store.remove_reflection(&id) {
                CliResult::success(format!("Removed {}", id))
            } else {
                not_found("Reflection", id)
            }
        }
        Commands::Show { id } => match store.reflection(&id) {
            Some(r) => CliResult::success(render_reflection(r)),
            None => not_found("Reflection", id),
        },
        Commands::List {
            category,
            tag,
            search,
            mood_min,
            mood_max,
            flagged,
            sort,
            ascending,
            limit,
        } => {
            let mut filter = ReflectionFilter::new()
                .with_categories(category)
                .with_tags(tag);
            if mood_min.is_some() || mood_max.is_some() {
                filter = filter.with_mood(mood_min.unwrap_or(1)..=mood_max.unwrap_or(10));
            }
            if let Some(text) = search {
                filter = filter.search(text);
            }
            if flagged {
                filter = filter.crisis_safe(false);
            }
            let direction = if ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            store.set_filter(filter);
            store.set_sort(SortSpec::new(sort, direction));
            execute_list(store, limit)
        }
        Commands::React { id, kind } => match store.react(&id, kind) {
            Some(count) => CliResult::success(format!("{} {} -> {}", id, kind, count)),
            None => not_found("Reflection", id),
        },
        Commands::Stats => CliResult::success(render_stats(store.stats())),
        Commands::Insights { generate } => execute_insights(store, generate),
        Commands::Goal { command } => execute_goal(store, command),
        Commands::Prompts { category } => execute_prompts(store, category),
        Commands::Export { format, output } => execute_export(store, format, output),
        Commands::Import { file } => execute_import(store, file),
        Commands::Reset { yes } => {
            if !yes {
                return CliResult::error("Refusing to reset without --yes");
            }
            store.reset();
            CliResult::success("All reflections, goals and insights deleted")
        }
    }
}

fn not_found(entity: &str, id: String) -> CliResult {
    CliResult::error(
        EngineError::NotFound {
            entity: entity.to_string(),
            id,
        }
        .to_string(),
    )
}

async fn execute_add(store: &mut ReflectionStore, draft: ReflectionDraft) -> CliResult {
    match store.add_reflection(draft).await {
        Ok(outcome) => {
            let r = &outcome.reflection;
            let mut out = format!(
                "Saved {} ({} words, ~{} min read)\n",
                r.id, r.word_count, r.reading_time
            );
            out.push_str(&escalation_notice(&outcome.escalation));
            let stats = store.stats();
            out.push_str(&format!(
                "Streak: {} day(s) | This week: {}/{}\n",
                stats.current_streak, stats.reflections_this_week, stats.weekly_goal
            ));
            CliResult::success(out)
        }
        Err(e) => CliResult::error(format!("Could not save reflection: {}", e)),
    }
}

fn escalation_notice(status: &EscalationStatus) -> String {
    match status {
        EscalationStatus::NotRequired => String::new(),
        EscalationStatus::Disabled | EscalationStatus::Requested => {
            "This entry mentions thoughts of crisis. If you are in danger, please reach out to \
             local emergency services or a crisis line now.\n"
                .to_string()
        }
        EscalationStatus::Failed(e) => format!(
            "This entry mentions thoughts of crisis. Escalation could not be sent ({}). \
             If you are in danger, please reach out to local emergency services or a crisis \
             line now.\n",
            e
        ),
    }
}

fn execute_list(store: &ReflectionStore, limit: usize) -> CliResult {
    let matches = store.filtered_reflections();
    let mut output = String::new();
    output.push_str(&format!("\nReflections ({} matching)\n", matches.len()));
    output.push_str(RULE);
    for r in matches.iter().take(limit) {
        output.push_str(&format!(
            "{}  {}  [{}]{}  {}\n",
            r.id,
            r.created_at.format("%Y-%m-%d %H:%M"),
            r.category,
            r.mood.map(|m| format!(" mood {}", m)).unwrap_or_default(),
            r.title
        ));
    }
    if matches.len() > limit {
        output.push_str(&format!("... {} more\n", matches.len() - limit));
    }
    CliResult::success(output)
}

fn execute_insights(store: &mut ReflectionStore, generate: bool) -> CliResult {
    if generate {
        store.generate_insights();
    }
    let mut output = String::new();
    output.push_str("\nInsights\n");
    output.push_str(RULE);
    if store.insights().is_empty() {
        output.push_str("No insights yet. Run with --generate.\n");
    }
    for insight in store.insights() {
        let severity = match insight.severity {
            Some(Severity::Crisis) => "[CRISIS]",
            Some(Severity::High) => "[HIGH]",
            Some(Severity::Medium) => "[MEDIUM]",
            Some(Severity::Low) => "[LOW]",
            None => "",
        };
        output.push_str(&format!(
            "{} {} ({:.0}% confidence)\n  {}\n",
            severity,
            insight.title,
            insight.confidence * 100.0,
            insight.description
        ));
        for rec in &insight.recommendations {
            output.push_str(&format!("  - {}\n", rec));
        }
    }
    CliResult::success(output)
}

fn execute_goal(store: &mut ReflectionStore, command: GoalCommands) -> CliResult {
    match command {
        GoalCommands::Add {
            title,
            category,
            frequency,
            days,
            description,
        } => {
            let start = Utc::now();
            let Some(target) = Duration::try_days(days).and_then(|span| start.checked_add_signed(span))
            else {
                return CliResult::error(format!("Invalid goal: --days {} is out of range", days));
            };
            let goal = match Goal::new(title, category, frequency, start, target) {
                Ok(g) => g.with_description(description.unwrap_or_default()),
                Err(e) => return CliResult::error(format!("Invalid goal: {}", e)),
            };
            match store.add_goal(goal) {
                Ok(goal) => CliResult::success(format!("Goal {} created", goal.id)),
                Err(e) => CliResult::error(format!("Invalid goal: {}", e)),
            }
        }
        GoalCommands::List => {
            let mut output = String::new();
            output.push_str("\nGoals\n");
            output.push_str(RULE);
            for goal in store.goals() {
                output.push_str(&format!(
                    "{}  {} [{} {}] {:.0}%{}\n",
                    goal.id,
                    goal.title,
                    goal.category,
                    goal.target_frequency,
                    goal.progress,
                    if goal.is_active { "" } else { " (paused)" }
                ));
            }
            CliResult::success(output)
        }
        GoalCommands::Remove { id } => {
            if store.remove_goal(&id) {
                CliResult::success(format!("Removed goal {}", id))
            } else {
                not_found("Goal", id)
            }
        }
    }
}

fn execute_prompts(store: &ReflectionStore, category: Option<Category>) -> CliResult {
    let prompts: Vec<_> = match category {
        Some(c) => store.prompts_for_category(c),
        None => store.prompts().iter().collect(),
    };
    let mut output = String::new();
    for p in prompts {
        output.push_str(&format!("{}  [{}] {}\n", p.id, p.category, p.text));
    }
    CliResult::success(output)
}

fn execute_export(
    store: &ReflectionStore,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> CliResult {
    let bytes = match store.export(format, None) {
        Ok(b) => b,
        Err(e) => return CliResult::error(format!("Export failed: {}", e)),
    };
    match output {
        Some(path) => match std::fs::write(&path, &bytes) {
            Ok(()) => CliResult::success(format!(
                "Exported {} reflection(s) to {}",
                store.len(),
                path.display()
            )),
            Err(e) => CliResult::error(format!("Failed to write {}: {}", path.display(), e)),
        },
        None => CliResult::success(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn execute_import(store: &mut ReflectionStore, file: PathBuf) -> CliResult {
    let bytes = match std::fs::read(&file) {
        Ok(b) => b,
        Err(e) => return CliResult::error(format!("Failed to read {}: {}", file.display(), e)),
    };
    match store.import_json(&bytes) {
        Ok(report) => {
            let mut out = format!(
                "Imported {} reflection(s); {} duplicate(s), {} rejected\n",
                report.accepted,
                report.duplicates,
                report.rejected.len()
            );
            for (index, reason) in &report.rejected {
                out.push_str(&format!("  record {}: {}\n", index, reason));
            }
            CliResult::success(out)
        }
        Err(e) => CliResult::error(format!("Import failed: {}", e)),
    }
}

fn render_reflection(r: &Reflection) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", r.title));
    out.push_str(RULE);
    out.push_str(&format!(
        "{} | {} | {} words",
        r.created_at.format("%Y-%m-%d %H:%M"),
        r.category,
        r.word_count
    ));
    if let Some(mood) = r.mood {
        out.push_str(&format!(" | mood {}", mood));
    }
    if r.is_private {
        out.push_str(" | private");
    }
    out.push('\n');
    if let Some(prompt) = &r.prompt {
        out.push_str(&format!("Prompt: {}\n", prompt));
    }
    out.push('\n');
    out.push_str(&r.content);
    out.push('\n');
    if !r.tags.is_empty() {
        let tags: Vec<&str> = r.tags.iter().map(String::as_str).collect();
        out.push_str(&format!("\nTags: {}\n", tags.join(", ")));
    }
    out
}

fn render_stats(stats: &Stats) -> String {
    let mut out = String::new();
    out.push_str("\nReflection Stats\n");
    out.push_str(RULE);
    out.push_str(&format!("Total reflections:   {}\n", stats.total_reflections));
    out.push_str(&format!("Average mood:        {:.1}\n", stats.average_mood));
    out.push_str(&format!(
        "Mood trend:          {} ({:+.1} vs last week)\n",
        stats.mood_trend.direction, stats.mood_trend.weekly_change
    ));
    out.push_str(&format!(
        "Streak:              {} current / {} longest\n",
        stats.current_streak, stats.longest_streak
    ));
    out.push_str(&format!(
        "This week:           {}/{} ({:.0}%)\n",
        stats.reflections_this_week, stats.weekly_goal, stats.progress_to_goal
    ));
    if let Some(category) = stats.most_active_category {
        out.push_str(&format!("Most active:         {}\n", category));
    }
    out.push_str(&format!(
        "Growth score:        {:.0}/100\n",
        stats.emotional_growth_score
    ));
    out.push_str(&format!(
        "Safety score:        {:.0}/100\n",
        stats.crisis_safety_score
    ));
    out.push_str("\nBy category:\n");
    for (category, count) in stats.category_breakdown.iter().filter(|(_, n)| **n > 0) {
        out.push_str(&format!("  {:<14} {}\n", category.as_str(), count));
    }
    out
}
